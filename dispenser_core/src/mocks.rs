//! Scripted devices for driving the controller in tests.
//!
//! Each device shares its observations through a cloneable handle so a test
//! can inspect them after the device has moved into the controller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use dispenser_traits::{Actuator, ButtonLevels, DeviceError, MotionSensor, RangeSensor, ReviewButtons};

use crate::report::{InteractionRecord, RecordSink, SinkError};

fn next<T: Copy>(seq: &[T], idx: &mut usize, fallback: T) -> T {
    let v = seq
        .get(*idx)
        .or_else(|| seq.last())
        .copied()
        .unwrap_or(fallback);
    *idx = idx.saturating_add(1);
    v
}

/// Replays distances in order, then repeats the last one.
pub struct ScriptedRange {
    seq: Vec<f32>,
    idx: usize,
    reads: Rc<Cell<usize>>,
}

impl ScriptedRange {
    pub fn new(seq: impl Into<Vec<f32>>) -> Self {
        Self {
            seq: seq.into(),
            idx: 0,
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn reads(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl RangeSensor for ScriptedRange {
    fn distance_cm(&mut self) -> Result<f32, DeviceError> {
        self.reads.set(self.reads.get() + 1);
        Ok(next(&self.seq, &mut self.idx, f32::INFINITY))
    }
}

/// Replays PIR levels in order, then repeats the last one.
pub struct ScriptedMotion {
    seq: Vec<bool>,
    idx: usize,
    reads: Rc<Cell<usize>>,
}

impl ScriptedMotion {
    pub fn new(seq: impl Into<Vec<bool>>) -> Self {
        Self {
            seq: seq.into(),
            idx: 0,
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn reads(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl MotionSensor for ScriptedMotion {
    fn is_active(&mut self) -> Result<bool, DeviceError> {
        self.reads.set(self.reads.get() + 1);
        Ok(next(&self.seq, &mut self.idx, false))
    }
}

/// Records every commanded angle. Optionally fails from the n-th command on.
#[derive(Default)]
pub struct RecordingActuator {
    angles: Rc<RefCell<Vec<f32>>>,
    fail_from: Option<usize>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands with index >= `n` (0-based) return an error and are not recorded.
    pub fn failing_from(n: usize) -> Self {
        Self {
            angles: Rc::default(),
            fail_from: Some(n),
        }
    }

    pub fn angles(&self) -> Rc<RefCell<Vec<f32>>> {
        self.angles.clone()
    }
}

impl Actuator for RecordingActuator {
    fn set_angle(&mut self, degrees: f32) -> Result<(), DeviceError> {
        let issued = self.angles.borrow().len();
        if self.fail_from.is_some_and(|n| issued >= n) {
            self.fail_from = None;
            return Err("servo bus fault".into());
        }
        self.angles.borrow_mut().push(degrees);
        Ok(())
    }
}

/// Replays button snapshots in order, then repeats the last one.
pub struct ScriptedButtons {
    seq: Vec<ButtonLevels>,
    idx: usize,
    reads: Rc<Cell<usize>>,
}

impl ScriptedButtons {
    pub fn new(seq: impl Into<Vec<ButtonLevels>>) -> Self {
        Self {
            seq: seq.into(),
            idx: 0,
            reads: Rc::new(Cell::new(0)),
        }
    }

    /// Reports `satisfactory` on every read.
    pub fn always_satisfied() -> Self {
        Self::new(vec![ButtonLevels {
            satisfactory: true,
            ..ButtonLevels::default()
        }])
    }

    pub fn reads(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl ReviewButtons for ScriptedButtons {
    fn read(&mut self) -> Result<ButtonLevels, DeviceError> {
        self.reads.set(self.reads.get() + 1);
        Ok(next(&self.seq, &mut self.idx, ButtonLevels::default()))
    }
}

/// Sink that keeps every delivered record.
#[derive(Default, Clone)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<InteractionRecord>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<InteractionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RecordSink for CollectingSink {
    fn deliver(&mut self, record: &InteractionRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| "collecting sink poisoned")?
            .push(*record);
        Ok(())
    }
}
