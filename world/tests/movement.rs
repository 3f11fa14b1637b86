use glam::Vec2;
use stagewalker_core::{Command, Direction, Directive, EntityClass, Event, Groups, StageCoord, TileCoord};
use stagewalker_world::{apply, query, LevelGrid, SimulationConfig, World, WorldError, LevelError};

fn config(columns: u32, rows: u32) -> SimulationConfig {
    SimulationConfig {
        stage_columns: columns,
        stage_rows: rows,
        ..SimulationConfig::default()
    }
}

fn world(rows: &[&str], config: SimulationConfig, directives: Vec<Directive>) -> World {
    let grid = LevelGrid::from_rows(rows.iter().copied(), config.stage_size(), config.tile_size)
        .expect("rectangular level");
    let mut world = World::new(config, grid, directives).expect("valid world");
    let mut events = Vec::new();
    apply(&mut world, Command::LoadStage { stage: StageCoord::new(0, 0) }, &mut events)
        .expect("stage loads");
    world
}

fn steer(world: &mut World, direction: Vec2) {
    let mut events = Vec::new();
    apply(world, Command::SteerPlayer { direction }, &mut events).expect("steering never fails");
}

fn tick(world: &mut World, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..frames {
        apply(world, Command::Tick, &mut events).expect("tick succeeds");
    }
    events
}

#[test]
fn player_stops_flush_against_wall() {
    let mut world = world(&["######", "#P...#", "#....#", "######"], config(6, 4), Vec::new());
    steer(&mut world, Vec2::X);

    let _ = tick(&mut world, 30);

    let player = query::player(&world);
    assert_eq!(player.position, Vec2::new(296.0, 96.0));
    assert_eq!(player.velocity, Vec2::ZERO);
}

#[test]
fn player_slides_along_wall_when_moving_diagonally() {
    let mut world = world(&["######", "#P...#", "#....#", "######"], config(6, 4), Vec::new());
    steer(&mut world, Vec2::new(1.0, -1.0));

    let _ = tick(&mut world, 5);

    let player = query::player(&world);
    assert!(player.position.y >= 88.0 && player.position.y < 89.0);
    assert_eq!(player.velocity, Vec2::new(8.0, 0.0));
    assert!(player.hit_box.min().y >= 64.0);
}

#[test]
fn crossing_the_screen_edge_enters_the_neighbour_stage() {
    let mut world = world(
        &["############", "#...........", "#P..........", "############"],
        config(6, 4),
        Vec::new(),
    );
    steer(&mut world, Vec2::X);

    let events = tick(&mut world, 36);
    assert!(events.contains(&Event::ScreenBoundCrossed {
        bound: Direction::East
    }));

    let mut events = Vec::new();
    apply(&mut world, Command::EnterStage { bound: Direction::East }, &mut events).expect("neighbour exists");

    assert_eq!(query::stage(&world), StageCoord::new(1, 0));
    assert_eq!(query::player(&world).position, Vec2::new(0.0, 160.0));
    assert_eq!(
        events,
        vec![Event::StageLoaded {
            stage: StageCoord::new(1, 0),
            spawned: 12
        }]
    );
}

#[test]
fn entering_a_missing_stage_fails_without_moving() {
    let mut world = world(&["######", "#P...#", "#....#", "######"], config(6, 4), Vec::new());
    let before = query::entities(&world);

    let mut events = Vec::new();
    let error = apply(&mut world, Command::EnterStage { bound: Direction::West }, &mut events)
        .expect_err("no stage west of the origin");

    assert!(matches!(
        error,
        WorldError::Level(LevelError::StageOutOfBounds { .. })
    ));
    assert!(events.is_empty());
    assert_eq!(query::stage(&world), StageCoord::new(0, 0));
    assert_eq!(query::entities(&world), before);
}

#[test]
fn walking_into_a_block_pushes_it_one_tile() {
    let mut world = world(&["######", "#PB..#", "#....#", "######"], config(6, 4), Vec::new());
    let block = query::entities(&world)
        .into_iter()
        .find(|entity| entity.class == EntityClass::Block)
        .expect("block spawned")
        .id;

    steer(&mut world, Vec2::X);
    let first = tick(&mut world, 1);
    assert!(!first.iter().any(|event| matches!(event, Event::BlockPushed { .. })));

    let second = tick(&mut world, 1);
    assert!(second.contains(&Event::BlockPushed {
        block,
        direction: Direction::East
    }));

    steer(&mut world, Vec2::ZERO);
    let _ = tick(&mut world, 70);

    let snapshot = query::entity(&world, block).expect("block persists");
    assert_eq!(snapshot.position, Vec2::new(224.0, 96.0));
    assert_eq!(snapshot.velocity, Vec2::ZERO);
    assert_eq!(snapshot.groups, Groups::MOVABLES);
}

#[test]
fn enemy_walking_into_a_block_pushes_it_too() {
    let mut config = config(6, 4);
    config.fire_mage.range = 10.0;
    let mut world = world(&["######", "#P.BF#", "#....#", "######"], config, Vec::new());
    let block = query::entities(&world)
        .into_iter()
        .find(|entity| entity.class == EntityClass::Block)
        .expect("block spawned")
        .id;
    let mage = query::enemies(&world)[0].id;

    let events = tick(&mut world, 120);

    assert!(events.contains(&Event::BlockPushed {
        block,
        direction: Direction::West
    }));
    let snapshot = query::entity(&world, block).expect("block persists");
    assert!(snapshot.position.x <= 160.0, "{:?}", snapshot.position);
    assert_eq!(snapshot.position.y, 96.0);
    assert!(!snapshot.hit_box.intersects(&query::player(&world).hit_box));
    let mage = query::entity(&world, mage).expect("mage alive");
    assert!(mage.position.x < 256.0);
}

#[test]
fn closing_door_pushes_player_to_free_neighbour() {
    let door = Directive::Door {
        stage: StageCoord::new(0, 0),
        from: TileCoord::new(3, 1),
        to: TileCoord::new(3, 2),
    };
    let mut world = world(&["######", "#P...#", "#....#", "######"], config(6, 4), vec![door]);
    let door = query::entities(&world)
        .into_iter()
        .find(|entity| entity.class == EntityClass::Door)
        .expect("door spawned")
        .id;

    steer(&mut world, Vec2::X);
    let _ = tick(&mut world, 12);
    assert_eq!(query::player(&world).position.x, 168.0);

    let mut events = Vec::new();
    apply(&mut world, Command::Interact, &mut events).expect("door opens");
    assert_eq!(events, vec![Event::DoorToggled { door, open: true }]);

    let _ = tick(&mut world, 10);
    assert_eq!(query::player(&world).position.x, 248.0);

    let mut events = Vec::new();
    apply(&mut world, Command::Interact, &mut events).expect("door still animating");
    assert!(events.is_empty());

    steer(&mut world, Vec2::ZERO);
    let _ = tick(&mut world, 20);

    let mut events = Vec::new();
    apply(&mut world, Command::Interact, &mut events).expect("door closes");
    assert_eq!(events, vec![Event::DoorToggled { door, open: false }]);
    assert_eq!(query::player(&world).position, Vec2::new(280.0, 96.0));
    assert_eq!(
        query::entity(&world, door).expect("door persists").groups,
        Groups::WALLS
    );
}
