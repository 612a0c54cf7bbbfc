//! Bounce — a ball ricocheting around a walled room, headless.
//!
//! Runs a fixed-step simulation for five seconds and prints the room as
//! ASCII every half second. Run with `RUST_LOG=debug` to watch the scene's
//! lifecycle logging.

use ormr::prelude::*;

const ROOM_W: i32 = 40;
const ROOM_H: i32 = 12;
const TILE: f32 = 8.0;

/// The room: a hollow rectangle of solid tiles.
struct Walls {
    collider: Collider,
}

impl Walls {
    fn new() -> Self {
        let mut collider = Collider::hitgrid(TILE, TILE).with_tag("solid");
        let grid = collider.as_hitgrid_mut().unwrap();
        grid.set(true, 0, 0, ROOM_W, 1);
        grid.set(true, 0, ROOM_H - 1, ROOM_W, 1);
        grid.set(true, 0, 0, 1, ROOM_H);
        grid.set(true, ROOM_W - 1, 0, 1, ROOM_H);
        Self { collider }
    }
}

impl Component for Walls {
    fn collider(&self) -> Option<&Collider> {
        Some(&self.collider)
    }
    fn collider_mut(&mut self) -> Option<&mut Collider> {
        Some(&mut self.collider)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

fn room() -> Entity {
    let mut e = Entity::new();
    e.add(Box::new(Walls::new()));
    e
}

fn ball() -> Entity {
    let mut body = Physics::new(0.0, 0.0, TILE, TILE)
        .with_solid("solid")
        .with_speed(Vec2::new(170.0, 110.0));
    body.on_collide_x(Box::new(|body, _| body.speed.x = -body.speed.x));
    body.on_collide_y(Box::new(|body, _| body.speed.y = -body.speed.y));

    let mut e = Entity::at(Vec2::new(TILE * 5.0, TILE * 5.0));
    e.add(Box::new(body));
    e.group("ball");
    e
}

fn draw(scene: &Scene) {
    let ball = scene
        .first_entity_in_group("ball")
        .and_then(|id| scene.get(id))
        .map(|e| e.position)
        .unwrap_or(Vec2::ZERO);
    let (bx, by) = ((ball.x / TILE) as i32, (ball.y / TILE) as i32);

    let mut out = String::new();
    for ty in 0..ROOM_H {
        for tx in 0..ROOM_W {
            let border = tx == 0 || ty == 0 || tx == ROOM_W - 1 || ty == ROOM_H - 1;
            out.push(if (tx, ty) == (bx, by) {
                'o'
            } else if border {
                '#'
            } else {
                ' '
            });
        }
        out.push('\n');
    }
    println!("{out}");
}

fn main() {
    env_logger::init();

    let mut scene = Scene::new();
    scene.add(room(), None);
    scene.add(ball(), None);

    let mut time = Time::fixed(1.0 / 60.0);
    for frame in 0..300u32 {
        time.tick();
        scene.update(time.delta_secs());
        if frame % 30 == 0 {
            draw(&scene);
        }
    }
    scene.verify_indices();
    println!("simulated {:.1}s over {} frames", time.elapsed_secs(), time.frame_count());
}
