use thiserror::Error;
use tracing::warn;

use crate::engine::SceneWorld;

/// regular user systems run here unless they ask otherwise
pub const PRIORITY_REGULAR: u32 = 100_000;

/// the built-in input-state system runs above everything user-registered,
/// after message reception
pub const PRIORITY_INPUT_SYSTEM: u32 = 1 << 20;

pub type SystemFn = Box<dyn FnMut(&mut SceneWorld, f32)>;
pub type TaskFn = Box<dyn FnOnce(&mut SceneWorld) -> anyhow::Result<()>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("system {0} is already registered")]
    DuplicateSystem(String),
}

struct SystemEntry {
    name: String,
    priority: u32,
    func: SystemFn,
}

/// Priority-ordered system list. Higher priorities run first; systems of
/// equal priority keep registration order. System functions are plain
/// synchronous closures over the world, so there is no awaitable to guard
/// against.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<SystemEntry>,
}

impl Scheduler {
    pub fn add_system(
        &mut self,
        priority: u32,
        name: impl Into<String>,
        func: impl FnMut(&mut SceneWorld, f32) + 'static,
    ) -> Result<(), ScheduleError> {
        let name = name.into();
        if self.systems.iter().any(|entry| entry.name == name) {
            return Err(ScheduleError::DuplicateSystem(name));
        }
        self.systems.push(SystemEntry {
            name,
            priority,
            func: Box::new(func),
        });
        // stable sort: equal priorities keep insertion order
        self.systems
            .sort_by_key(|entry| std::cmp::Reverse(entry.priority));
        Ok(())
    }

    pub fn remove_system(&mut self, name: &str) -> bool {
        let before = self.systems.len();
        self.systems.retain(|entry| entry.name != name);
        self.systems.len() != before
    }

    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|entry| entry.name.as_str())
    }

    pub(crate) fn run(&mut self, world: &mut SceneWorld, dt: f32) {
        // one-shot tasks run before any system sees the new tick
        for task in world.take_tasks() {
            if let Err(error) = task(world) {
                warn!("queued task failed: {error:#}");
            }
        }

        for entry in &mut self.systems {
            (entry.func)(world, dt);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn record(order: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> impl FnMut(&mut SceneWorld, f32) {
        let order = order.clone();
        move |_, _| order.borrow_mut().push(tag)
    }

    #[test]
    fn systems_run_in_descending_priority() {
        let mut scheduler = Scheduler::default();
        let mut world = SceneWorld::default();
        let order = Rc::new(RefCell::new(Vec::default()));

        scheduler.add_system(1, "low", record(&order, "low")).unwrap();
        scheduler
            .add_system(PRIORITY_INPUT_SYSTEM, "input", record(&order, "input"))
            .unwrap();
        scheduler
            .add_system(PRIORITY_REGULAR, "regular", record(&order, "regular"))
            .unwrap();

        scheduler.run(&mut world, 0.016);
        assert_eq!(order.borrow().as_slice(), &["input", "regular", "low"]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut scheduler = Scheduler::default();
        let mut world = SceneWorld::default();
        let order = Rc::new(RefCell::new(Vec::default()));

        for tag in ["first", "second", "third"] {
            scheduler
                .add_system(PRIORITY_REGULAR, tag, record(&order, tag))
                .unwrap();
        }
        scheduler.run(&mut world, 0.016);
        assert_eq!(order.borrow().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn duplicate_system_names_are_rejected() {
        let mut scheduler = Scheduler::default();
        scheduler
            .add_system(PRIORITY_REGULAR, "tick", |_, _| {})
            .unwrap();
        assert_eq!(
            scheduler.add_system(PRIORITY_REGULAR, "tick", |_, _| {}),
            Err(ScheduleError::DuplicateSystem("tick".to_owned()))
        );
    }

    #[test]
    fn removed_systems_stop_running() {
        let mut scheduler = Scheduler::default();
        let mut world = SceneWorld::default();
        let order = Rc::new(RefCell::new(Vec::default()));

        scheduler
            .add_system(PRIORITY_REGULAR, "tick", record(&order, "tick"))
            .unwrap();
        assert!(scheduler.remove_system("tick"));
        assert!(!scheduler.remove_system("tick"));
        scheduler.run(&mut world, 0.016);
        assert!(order.borrow().is_empty());
    }

    #[test]
    fn tasks_run_once_before_systems() {
        let mut scheduler = Scheduler::default();
        let mut world = SceneWorld::default();
        let order = Rc::new(RefCell::new(Vec::default()));

        scheduler
            .add_system(PRIORITY_REGULAR, "tick", record(&order, "system"))
            .unwrap();

        let sink = order.clone();
        world.enqueue_task(move |_| {
            sink.borrow_mut().push("task");
            Ok(())
        });

        scheduler.run(&mut world, 0.016);
        scheduler.run(&mut world, 0.016);
        assert_eq!(order.borrow().as_slice(), &["task", "system", "system"]);
    }

    #[test]
    fn failing_tasks_do_not_stop_the_tick() {
        let mut scheduler = Scheduler::default();
        let mut world = SceneWorld::default();
        let ran = Rc::new(RefCell::new(false));

        world.enqueue_task(|_| anyhow::bail!("boom"));
        let sink = ran.clone();
        scheduler
            .add_system(PRIORITY_REGULAR, "tick", move |_, _| *sink.borrow_mut() = true)
            .unwrap();

        scheduler.run(&mut world, 0.016);
        assert!(*ran.borrow());
    }
}
