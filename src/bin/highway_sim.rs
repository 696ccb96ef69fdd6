// Closed-loop highway driving simulation
//
// Drives the planner on a synthetic ring road (or a waypoint file) with
// random constant-speed traffic. Each cycle the simulated controller
// consumes a few points of the planned path, and the rest is fed back as
// the previous path, the same way the external simulator does.
//
// usage: highway_sim [config.toml] [waypoints.csv]

use highway_planner::common::{Point2D, MPH_TO_MPS};
use highway_planner::map::synthetic::circular_track;
use highway_planner::utils::{PathStyle, Visualizer};
use highway_planner::{
    CoordinateTransform, HighwayPlanner, Path2D, PlannerConfig, PlanningError, PlanningResult, Pose2D,
    SensorFusionRecord, Telemetry, WaypointMap,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SEED: u64 = 7;
const CYCLES: usize = 600;
/// Path points executed between two telemetry reports
const CONSUMED_PER_CYCLE: usize = 5;
const TRAFFIC_COUNT: u32 = 12;
/// Ring road roughly as long as the reference track
const RING_RADIUS: f64 = 1105.0;
const RING_WAYPOINTS: usize = 700;
const EGO_START_S: f64 = 50.0;

struct TrafficCar {
    id: u32,
    s: f64,
    d: f64,
    v: f64,
}

impl TrafficCar {
    fn record(&self, transform: &CoordinateTransform) -> SensorFusionRecord {
        let position = transform.to_cartesian(self.s, self.d);
        let heading = transform.track_heading(self.s);
        let mut record = SensorFusionRecord::new(
            self.id,
            position.x,
            position.y,
            self.v * heading.cos(),
            self.v * heading.sin(),
        );
        record.s = self.s;
        record.d = self.d;
        record
    }
}

fn spawn_traffic(rng: &mut StdRng, config: &PlannerConfig, max_s: f64) -> PlanningResult<Vec<TrafficCar>> {
    let speed = Normal::<f64>::new(17.0, 2.5).map_err(|e| PlanningError::Config(e.to_string()))?;
    let cars = (0..TRAFFIC_COUNT)
        .map(|id| {
            let lane = rng.gen_range(0..config.road.num_lanes);
            TrafficCar {
                id,
                s: (EGO_START_S + rng.gen_range(30.0..max_s - 30.0)) % max_s,
                d: config.road.lane_center(lane),
                v: speed.sample(rng).clamp(8.0, config.limits.speed_limit - 1.0),
            }
        })
        .collect();
    Ok(cars)
}

fn telemetry(
    transform: &CoordinateTransform,
    ego: Point2D,
    yaw: f64,
    speed: f64,
    remaining: &[Point2D],
    sensor_fusion: Vec<SensorFusionRecord>,
) -> Telemetry {
    let frenet = transform.to_frenet(ego.x, ego.y, yaw);
    let end = match remaining {
        [.., before, last] => transform.to_frenet(last.x, last.y, before.heading_to(last)),
        [last] => transform.to_frenet(last.x, last.y, yaw),
        [] => frenet,
    };
    Telemetry {
        x: ego.x,
        y: ego.y,
        s: frenet.s,
        d: frenet.d,
        yaw: yaw.to_degrees(),
        speed: speed / MPH_TO_MPS,
        previous_path_x: remaining.iter().map(|p| p.x).collect(),
        previous_path_y: remaining.iter().map(|p| p.y).collect(),
        end_path_s: end.s,
        end_path_d: end.d,
        sensor_fusion,
    }
}

fn main() -> PlanningResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("highway_planner=info,highway_sim=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            PlannerConfig::load(Path::new(path))?
        }
        None => PlannerConfig::default(),
    };
    let map = match args.get(2) {
        Some(path) => {
            info!("Loading waypoints from {}", path);
            WaypointMap::load(Path::new(path))?
        }
        None => circular_track(RING_RADIUS, RING_WAYPOINTS)?,
    };

    let mut planner = HighwayPlanner::new(map, config.clone())?;
    let transform = planner.transform().clone();
    let max_s = transform.max_s();
    let tick = config.trajectory.tick;
    let cycle_time = CONSUMED_PER_CYCLE as f64 * tick;

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut traffic = spawn_traffic(&mut rng, &config, max_s)?;

    let start = transform.to_cartesian(EGO_START_S, config.road.lane_center(config.road.center_lane()));
    let mut ego = start;
    let mut yaw = transform.track_heading(EGO_START_S);
    let mut speed = 0.0;
    let mut remaining: Vec<Point2D> = Vec::new();
    let mut driven = Path2D::from_points(vec![start]);
    let mut min_gap = f64::INFINITY;
    let mut lane_changes = 0;
    let mut last_lane = None;

    info!("Highway simulation start: {} cycles, {} cars", CYCLES, traffic.len());
    for cycle in 0..CYCLES {
        let fusion: Vec<SensorFusionRecord> = traffic.iter().map(|car| car.record(&transform)).collect();
        let report = telemetry(&transform, ego, yaw, speed, &remaining, fusion);
        let path = match planner.plan_cycle(&report, cycle as f64 * cycle_time) {
            Ok(path) => path,
            Err(e) => {
                warn!("cycle {} skipped: {}", cycle, e);
                continue;
            }
        };

        // controller executes the head of the path
        let executed = &path.points[..CONSUMED_PER_CYCLE.min(path.len())];
        for point in executed {
            let step = ego.distance(point);
            if step > 1e-6 {
                yaw = ego.heading_to(point);
            }
            speed = step / tick;
            ego = *point;
            driven.push(*point);
        }
        remaining = path.points[executed.len()..].to_vec();

        for car in traffic.iter_mut() {
            car.s = (car.s + car.v * cycle_time) % max_s;
        }

        let ego_frenet = transform.to_frenet(ego.x, ego.y, yaw);
        for car in &traffic {
            if (car.d - ego_frenet.d).abs() < config.road.lane_width / 2.0 {
                let gap = transform.map().s_difference(ego_frenet.s, car.s).abs();
                min_gap = min_gap.min(gap);
            }
        }
        let lane = planner.ego().lane;
        if last_lane.map_or(false, |l| l != lane) {
            lane_changes += 1;
        }
        last_lane = Some(lane);
    }

    info!(
        "Highway simulation finish: {:.0} m driven, {} lane changes, closest same-lane gap {:.1} m",
        driven.total_length(),
        lane_changes,
        min_gap
    );
    info!("{}", planner.behavior().generate_diagram());

    let mut vis = Visualizer::new();
    vis.set_title("Highway planner simulation");
    vis.plot_track(&transform, &config.road, 10.0)
        .plot_path(&driven, &PathStyle::default().with_line_width(1.0))
        .plot_traffic(&traffic.iter().map(|car| transform.to_cartesian(car.s, car.d)).collect::<Vec<_>>())
        .plot_ego(&Pose2D::new(ego.x, ego.y, yaw), 1.5);
    std::fs::create_dir_all("img")?;
    let output_path = "img/highway_sim.png";
    match vis.save_png(output_path, 1000, 1000) {
        Ok(()) => info!("Plot saved to: {}", output_path),
        Err(e) => warn!("could not save plot: {}", e),
    }
    Ok(())
}
