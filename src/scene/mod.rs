use crate::flight::terrain::HeightfieldTerrain;
use crate::flight::trajectory::PointType;
use crate::flight::visual::PilotPose;
use crate::flight::FlightSim;
use crate::states::GameState;
use bevy::asset::RenderAssetUsages;
use bevy::math::primitives::ConicalFrustum;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

const CHASE_DISTANCE_M: f32 = 70.0;
const CHASE_HEIGHT_M: f32 = 22.0;
const CHASE_FOLLOW_RATE: f32 = 3.0;
const WING_SIZE: Vec3 = Vec3::new(10.0, 0.4, 2.2);
const PILOT_SIZE: Vec3 = Vec3::new(0.8, 1.6, 0.8);
const PILOT_HANG_M: f32 = 6.0;
const PILOT_LEAN_M: f32 = 0.7;

pub struct FlightScenePlugin;

impl Plugin for FlightScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.55, 0.72, 0.90)))
            .add_systems(Startup, spawn_camera_and_light)
            .add_systems(
                Update,
                spawn_flight_scene.run_if(resource_added::<FlightSim>),
            )
            .add_systems(
                Update,
                (sync_glider_transform, sync_pilot_pose, draw_trajectory, chase_camera)
                    .chain()
                    .run_if(resource_exists::<FlightSim>),
            )
            .add_systems(OnExit(GameState::Results), cleanup_flight_scene);
    }
}

#[derive(Component)]
struct FlightSceneEntity;

#[derive(Component)]
struct GliderVisual;

#[derive(Component)]
struct PilotVisual;

#[derive(Component)]
struct ChaseCamera;

fn spawn_camera_and_light(mut commands: Commands) {
    commands.spawn((
        Name::new("ChaseCamera"),
        ChaseCamera,
        Camera3d::default(),
        Transform::from_xyz(0.0, 600.0, -900.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 15_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(400.0, 1_000.0, -300.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn spawn_flight_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    sim: Res<FlightSim>,
) {
    let terrain = sim.terrain.as_ref();
    commands.spawn((
        Name::new("Terrain"),
        FlightSceneEntity,
        Mesh3d(meshes.add(build_heightfield_mesh(terrain))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.36, 0.48, 0.28),
            perceptual_roughness: 0.95,
            ..default()
        })),
        Transform::IDENTITY,
    ));

    if let Some(water_level) = terrain.water_level() {
        let near = terrain.node_position(0, 0);
        let far = terrain.node_position(terrain.rows() - 1, terrain.columns() - 1);
        let size = (far - near).xz();
        let center = (near + far) * 0.5;
        commands.spawn((
            Name::new("Water"),
            FlightSceneEntity,
            Mesh3d(meshes.add(Plane3d::default().mesh().size(size.x, size.y))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgba(0.16, 0.36, 0.55, 0.85),
                alpha_mode: AlphaMode::Blend,
                ..default()
            })),
            Transform::from_xyz(center.x, water_level, center.z),
        ));
    }

    for thermal in sim.model.thermals().thermals() {
        let tint = if thermal.is_super_thermal {
            Color::srgba(1.0, 0.45, 0.25, thermal.opacity)
        } else {
            Color::srgba(1.0, 0.85, 0.55, thermal.opacity)
        };
        commands.spawn((
            Name::new("Thermal"),
            FlightSceneEntity,
            Mesh3d(meshes.add(ConicalFrustum {
                radius_top: thermal.top_radius,
                radius_bottom: thermal.bottom_radius,
                height: thermal.height,
            })),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: tint,
                alpha_mode: AlphaMode::Blend,
                unlit: true,
                cull_mode: None,
                ..default()
            })),
            Transform::from_translation(thermal.position + Vec3::Y * thermal.height * 0.5),
        ));
    }

    let wing_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.92, 0.26, 0.18),
        ..default()
    });
    let pilot_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.15, 0.17, 0.22),
        ..default()
    });
    commands
        .spawn((
            Name::new("Glider"),
            FlightSceneEntity,
            GliderVisual,
            Transform::from_translation(sim.model.position())
                .with_rotation(sim.model.orientation()),
            Visibility::default(),
        ))
        .with_children(|glider| {
            glider.spawn((
                Name::new("Wing"),
                Mesh3d(meshes.add(Cuboid::from_size(WING_SIZE))),
                MeshMaterial3d(wing_material),
            ));
            glider.spawn((
                Name::new("Pilot"),
                PilotVisual,
                Mesh3d(meshes.add(Cuboid::from_size(PILOT_SIZE))),
                MeshMaterial3d(pilot_material),
                Transform::from_translation(pilot_offset(PilotPose::HandsUp)),
            ));
        });

    info!(
        "Spawned flight scene: {}x{} terrain at {:.0} m cells, {} thermals.",
        terrain.columns(),
        terrain.rows(),
        terrain.cell_size(),
        sim.model.thermals().thermals().len()
    );
}

/// Triangle mesh over the grid nodes with smooth normals.
fn build_heightfield_mesh(terrain: &HeightfieldTerrain) -> Mesh {
    let rows = terrain.rows();
    let columns = terrain.columns();
    let mut positions = Vec::with_capacity(rows * columns);
    let mut normals = Vec::with_capacity(rows * columns);
    let mut uvs = Vec::with_capacity(rows * columns);
    let mut indices = Vec::with_capacity((rows - 1) * (columns - 1) * 6);

    for row in 0..rows {
        for column in 0..columns {
            let node = terrain.node_position(row, column);
            let west = terrain.node_position(row, column.saturating_sub(1));
            let east = terrain.node_position(row, (column + 1).min(columns - 1));
            let south = terrain.node_position(row.saturating_sub(1), column);
            let north = terrain.node_position((row + 1).min(rows - 1), column);
            let normal = (north - south).cross(east - west).normalize_or(Vec3::Y);

            positions.push(node.to_array());
            normals.push(normal.to_array());
            uvs.push([
                column as f32 / (columns - 1) as f32,
                row as f32 / (rows - 1) as f32,
            ]);
        }
    }

    for row in 0..rows - 1 {
        for column in 0..columns - 1 {
            let base = (row * columns + column) as u32;
            let next_row = base + columns as u32;
            indices.extend_from_slice(&[
                base,
                next_row,
                base + 1,
                base + 1,
                next_row,
                next_row + 1,
            ]);
        }
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Pilot position under the wing. Local +X is the glider's left.
fn pilot_offset(pose: PilotPose) -> Vec3 {
    let lean = match pose {
        PilotPose::HandsUp => 0.0,
        PilotPose::BreakLeft => PILOT_LEAN_M,
        PilotPose::BreakRight => -PILOT_LEAN_M,
    };
    Vec3::new(lean, -PILOT_HANG_M, 0.0)
}

fn sync_glider_transform(
    sim: Res<FlightSim>,
    mut glider_query: Query<&mut Transform, With<GliderVisual>>,
) {
    let Ok(mut transform) = glider_query.single_mut() else {
        return;
    };
    transform.translation = sim.model.position();
    transform.rotation = sim.model.orientation();
}

fn sync_pilot_pose(sim: Res<FlightSim>, mut pilot_query: Query<&mut Transform, With<PilotVisual>>) {
    let offset = pilot_offset(sim.pilot_pose.current());
    for mut transform in &mut pilot_query {
        transform.translation = offset;
    }
}

fn trajectory_color(point_type: PointType) -> Color {
    match point_type {
        PointType::Normal => Color::srgb(0.95, 0.95, 0.98),
        PointType::SpeedBar => Color::srgb(0.25, 0.85, 0.95),
        PointType::Ears => Color::srgb(0.95, 0.80, 0.20),
        PointType::TouchGround => Color::srgb(0.95, 0.20, 0.20),
    }
}

fn draw_trajectory(sim: Res<FlightSim>, mut gizmos: Gizmos) {
    let trajectory = sim.model.trajectory();
    if trajectory.is_empty() {
        return;
    }
    let points = trajectory.points();
    for pair in points.windows(2) {
        gizmos.line(
            pair[0].position,
            pair[1].position,
            trajectory_color(pair[1].point_type),
        );
    }
    if let Some(crash) = trajectory.first_touch_ground() {
        gizmos.sphere(
            Isometry3d::from_translation(crash.position),
            4.0,
            trajectory_color(PointType::TouchGround),
        );
    }
}

fn chase_camera(
    time: Res<Time>,
    sim: Res<FlightSim>,
    mut camera_query: Query<&mut Transform, (With<ChaseCamera>, Without<GliderVisual>)>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let glider = sim.model.position();
    let heading = Vec3::new(sim.model.yaw().sin(), 0.0, sim.model.yaw().cos());
    let target = glider - heading * CHASE_DISTANCE_M + Vec3::Y * CHASE_HEIGHT_M;
    let blend = (time.delta_secs() * CHASE_FOLLOW_RATE).min(1.0);
    camera_transform.translation = camera_transform.translation.lerp(target, blend);
    camera_transform.look_at(glider, Vec3::Y);
}

fn cleanup_flight_scene(
    mut commands: Commands,
    scene_query: Query<Entity, With<FlightSceneEntity>>,
) {
    for entity in &scene_query {
        commands.entity(entity).try_despawn();
    }
}
