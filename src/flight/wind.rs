use super::shared::Shared;
use bevy::math::Vec3;
use serde::Deserialize;

/// Current atmospheric conditions. Mutable mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weather {
    /// Compass bearing in degrees, 0 = north.
    pub wind_bearing_degrees: f32,
    pub wind_speed_mps: f32,
    /// Condensation level altitude, used when laying out thermals.
    pub lcl_level: f32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            wind_bearing_degrees: 0.0,
            wind_speed_mps: 0.0,
            lcl_level: 1_500.0,
        }
    }
}

impl Weather {
    /// Horizontal unit vector for the bearing: the azimuth of a spherical
    /// coordinate whose polar angle is fixed at 90 degrees.
    pub fn wind_direction(&self) -> Vec3 {
        let azimuth = self.wind_bearing_degrees.rem_euclid(360.0).to_radians();
        Vec3::new(azimuth.sin(), 0.0, azimuth.cos())
    }

    pub fn wind_velocity(&self, scale: f32) -> Vec3 {
        self.wind_direction() * scale * self.wind_speed_mps
    }
}

/// Wind queries and mutations over the shared [`Weather`].
///
/// Every query reads the current weather, so a change is visible on the very
/// next call.
#[derive(Debug, Clone)]
pub struct WindModel {
    weather: Shared<Weather>,
}

impl WindModel {
    pub fn new(weather: Shared<Weather>) -> Self {
        Self { weather }
    }

    pub fn weather(&self) -> &Shared<Weather> {
        &self.weather
    }

    pub fn wind_direction(&self) -> Vec3 {
        self.weather.read().wind_direction()
    }

    pub fn wind_velocity(&self, scale: f32) -> Vec3 {
        self.weather.read().wind_velocity(scale)
    }

    pub fn change_direction(&self, degrees: f32) {
        self.weather.write().wind_bearing_degrees = degrees.rem_euclid(360.0);
    }

    pub fn change_speed(&self, meters_per_second: f32) {
        self.weather.write().wind_speed_mps = meters_per_second;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wind(bearing: f32, speed: f32) -> WindModel {
        WindModel::new(Shared::new(Weather {
            wind_bearing_degrees: bearing,
            wind_speed_mps: speed,
            ..Weather::default()
        }))
    }

    #[test]
    fn north_wind_has_requested_magnitude() {
        let model = wind(0.0, 5.0);
        let velocity = model.wind_velocity(1.0);
        assert!((model.wind_direction().length() - 1.0).abs() < 1e-6);
        assert!((velocity.length() - 5.0).abs() < 1e-5);
        assert!(velocity.y.abs() < 1e-6);
        assert!((velocity.z - 5.0).abs() < 1e-5);
    }

    #[test]
    fn velocity_is_independent_of_query_order() {
        let model = wind(135.0, 3.0);
        let first = model.wind_velocity(1.0);
        let _ = model.wind_direction();
        let _ = model.wind_velocity(0.025);
        assert_eq!(first, model.wind_velocity(1.0));
    }

    #[test]
    fn changes_apply_on_next_query() {
        let model = wind(0.0, 5.0);
        model.change_direction(90.0);
        model.change_speed(2.0);
        let velocity = model.wind_velocity(1.0);
        assert!((velocity.x - 2.0).abs() < 1e-5);
        assert!(velocity.z.abs() < 1e-5);
    }

    #[test]
    fn bearings_wrap_modulo_360() {
        let model = wind(0.0, 1.0);
        model.change_direction(-270.0);
        assert!((model.weather().read().wind_bearing_degrees - 90.0).abs() < 1e-4);

        let wrapped = wind(450.0, 1.0).wind_direction();
        let plain = wind(90.0, 1.0).wind_direction();
        assert!((wrapped - plain).length() < 1e-5);
    }

    #[test]
    fn scale_multiplies_displacement() {
        let model = wind(45.0, 4.0);
        let per_tick = model.wind_velocity(0.025);
        assert!((per_tick.length() - 0.1).abs() < 1e-5);
    }
}
