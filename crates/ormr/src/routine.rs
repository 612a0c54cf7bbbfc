//! # Routine — Timed Step Sequences
//!
//! A [`Routine`] is a component that walks a list of steps against the frame
//! clock: wait for a duration, invoke a closure, loop back to the start.
//! It is the building block for spawn waves, cutscene beats, and blinking
//! pickups — anything scripted against time rather than input.
//!
//! Waits carry their remainder across frames, and leftover frame time flows
//! into the following steps, so a repeating one-second wait fires exactly
//! once per second on average regardless of the frame rate.

use crate::component::{Component, Context};

/// One step of a [`Routine`].
pub enum Step {
    /// Consume `delta` until this many seconds have elapsed.
    Wait(f32),
    /// Invoke a closure with the component's update context. Consumes no
    /// time.
    Call(Box<dyn FnMut(&mut Context)>),
    /// Jump back to the first step.
    Loop,
}

/// A component that advances through [`Step`]s as frame time accrues.
///
/// ```no_run
/// use ormr::prelude::*;
///
/// let blink = Routine::new()
///     .wait(0.4)
///     .call(|ctx| ctx.entity.visible = false)
///     .wait(0.1)
///     .call(|ctx| ctx.entity.visible = true)
///     .looped();
/// ```
#[derive(Default)]
pub struct Routine {
    steps: Vec<Step>,
    cursor: usize,
    /// Seconds left on the wait currently in progress. Zero when no wait has
    /// started.
    remaining: f32,
    finished: bool,
}

impl Routine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a wait of `seconds`.
    pub fn wait(mut self, seconds: f32) -> Self {
        self.steps.push(Step::Wait(seconds));
        self
    }

    /// Append a closure invocation.
    pub fn call(mut self, f: impl FnMut(&mut Context) + 'static) -> Self {
        self.steps.push(Step::Call(Box::new(f)));
        self
    }

    /// Append a jump back to the first step. Steps after it never run.
    pub fn looped(mut self) -> Self {
        self.steps.push(Step::Loop);
        self
    }

    /// Whether the routine has run off the end of its steps. Always `false`
    /// for a looped routine.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Rewind to the first step and replay from scratch.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.remaining = 0.0;
        self.finished = false;
    }
}

impl Component for Routine {
    fn update(&mut self, ctx: &mut Context) {
        if self.finished || self.steps.is_empty() {
            return;
        }
        let mut budget = ctx.delta;
        // Trips the runaway guard when a loop iteration passes without any
        // wait consuming time.
        let mut spent = false;
        loop {
            if self.cursor >= self.steps.len() {
                self.finished = true;
                return;
            }
            match &mut self.steps[self.cursor] {
                Step::Wait(seconds) => {
                    if self.remaining <= 0.0 {
                        self.remaining = *seconds;
                    }
                    if budget < self.remaining {
                        self.remaining -= budget;
                        return;
                    }
                    // The wait elapses mid-frame; the leftover flows into
                    // the steps after it.
                    budget -= self.remaining;
                    self.remaining = 0.0;
                    self.cursor += 1;
                    spent = true;
                }
                Step::Call(f) => {
                    f(ctx);
                    self.cursor += 1;
                }
                Step::Loop => {
                    if !spent {
                        log::warn!("routine: loop cycle consumed no time; parking until next frame");
                        self.cursor = 0;
                        return;
                    }
                    self.cursor = 0;
                    spent = false;
                }
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::scene::Scene;
    use std::cell::Cell;
    use std::rc::Rc;

    fn scene_with(routine: Routine) -> Scene {
        let mut scene = Scene::new();
        let mut e = Entity::new();
        e.add(Box::new(routine));
        scene.add(e, None);
        scene
    }

    #[test]
    fn wait_carries_remainder_across_frames() {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let mut scene = scene_with(Routine::new().wait(2.0).call(move |_| f.set(f.get() + 1)));

        scene.update(0.75); // 1.25 left
        scene.update(0.75); // 0.5 left
        assert_eq!(fired.get(), 0);
        scene.update(0.75); // elapses mid-frame
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn leftover_time_flows_into_later_steps() {
        let a = Rc::new(Cell::new(false));
        let b = Rc::new(Cell::new(false));
        let (fa, fb) = (Rc::clone(&a), Rc::clone(&b));
        let mut scene = scene_with(
            Routine::new()
                .wait(0.5)
                .call(move |_| fa.set(true))
                .wait(0.25)
                .call(move |_| fb.set(true)),
        );

        // One big frame covers both waits.
        scene.update(1.0);
        assert!(a.get());
        assert!(b.get());
    }

    #[test]
    fn looped_routine_fires_once_per_period() {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let mut scene = scene_with(
            Routine::new()
                .wait(1.0)
                .call(move |_| f.set(f.get() + 1))
                .looped(),
        );

        for _ in 0..5 {
            scene.update(1.0);
        }
        assert_eq!(fired.get(), 5);
    }

    #[test]
    fn loop_without_wait_parks_instead_of_spinning() {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let mut scene = scene_with(Routine::new().call(move |_| f.set(f.get() + 1)).looped());

        scene.update(1.0 / 60.0); // must return, not spin
        assert_eq!(fired.get(), 1);
        scene.update(1.0 / 60.0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn finishes_and_restarts() {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let mut scene = Scene::new();
        let mut e = Entity::new();
        e.add(Box::new(
            Routine::new().wait(0.1).call(move |_| f.set(f.get() + 1)),
        ));
        let id = scene.add(e, None);

        scene.update(0.2);
        scene.update(0.2); // finished, no-op
        assert_eq!(fired.get(), 1);
        let routine = scene.get_mut(id).unwrap().find_mut::<Routine>().unwrap();
        assert!(routine.finished());

        routine.restart();
        scene.update(0.2);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn call_steps_can_mutate_the_entity() {
        let mut scene = Scene::new();
        let mut e = Entity::new();
        e.add(Box::new(
            Routine::new()
                .wait(0.5)
                .call(|ctx| ctx.entity.visible = false),
        ));
        let id = scene.add(e, None);

        scene.update(1.0);
        assert!(!scene.get(id).unwrap().visible);
    }
}
