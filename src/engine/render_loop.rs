/*
Render Loop
===========

  Stopped ──start()──▶ Running ◀──pause()/resume()──▶ Paused
                          │                              │
                          └──────────stop()──────────────┴──▶ Finished

One named thread owns the Session for the whole run. Per iteration:

  paused?  ── yes ──▶ sleep(pause_poll), nothing else
     │ no
  drain control queue → step-change callback → render block
  → raw capture → visualisation callback → device write (blocks)

The device write is the only blocking point and paces everything. Stop is
observed at the top of the loop, so the current block always completes; the
thread then drains the device, closes the capture and writes the WAV, and
that result is what `stop()` returns.
*/

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, RingBuffer};
use tracing::{debug, error, info, warn};

use super::control::{ControlMessage, Controller};
use super::session::Session;
use crate::error::{EngineError, Result};
use crate::output::{self, CaptureSummary, DeviceFactory, NullDevice, OutputSink};

/// Control messages that can be queued between two blocks.
const CONTROL_QUEUE_CAPACITY: usize = 1024;

pub const RENDER_THREAD_NAME: &str = "groovebox-render";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not started yet.
    Stopped,
    Running,
    Paused,
    /// A stop was requested through a [`Controller`]; `stop()` has not
    /// collected the thread yet.
    Stopping,
    /// Stopped for good. A render loop cannot be restarted.
    Finished,
}

/// Flags shared between the render thread and every [`Controller`].
#[derive(Debug, Default)]
pub(crate) struct Transport {
    pub(crate) running: AtomicBool,
    pub(crate) paused: AtomicBool,
    pub(crate) blocks: AtomicU64,
}

type VisualizeFn = Box<dyn FnMut(&[u8]) + Send>;
type StepChangeFn = Box<dyn FnMut(usize) + Send>;

/// Everything the render thread takes ownership of at start.
struct Worker {
    session: Session,
    device: DeviceFactory,
    sink: OutputSink,
    transport: Arc<Transport>,
    queue: Consumer<ControlMessage>,
    on_visualize: Option<VisualizeFn>,
    on_step_change: Option<StepChangeFn>,
    pause_poll: Duration,
}

pub struct RenderLoop {
    pending: Option<(Session, DeviceFactory, Consumer<ControlMessage>)>,
    on_visualize: Option<VisualizeFn>,
    on_step_change: Option<StepChangeFn>,
    transport: Arc<Transport>,
    controller: Controller,
    handle: Option<JoinHandle<Result<CaptureSummary>>>,
    finished: bool,
}

impl RenderLoop {
    pub fn new(session: Session, device: DeviceFactory) -> Self {
        let transport = Arc::new(Transport::default());
        let (producer, consumer) = RingBuffer::new(CONTROL_QUEUE_CAPACITY);
        Self {
            pending: Some((session, device, consumer)),
            on_visualize: None,
            on_step_change: None,
            controller: Controller::new(Arc::clone(&transport), producer),
            transport,
            handle: None,
            finished: false,
        }
    }

    /// Called on the render thread with every mixed block, before it is
    /// written to the device. Must not block.
    pub fn on_visualize(mut self, callback: impl FnMut(&[u8]) + Send + 'static) -> Self {
        self.on_visualize = Some(Box::new(callback));
        self
    }

    /// Called on the render thread whenever the first track's step changes.
    pub fn on_step_change(mut self, callback: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_step_change = Some(Box::new(callback));
        self
    }

    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Open the raw capture and spawn the render thread.
    pub fn start(&mut self) -> Result<()> {
        if self.finished {
            return Err(EngineError::Terminated);
        }
        let Some((session, device, queue)) = self.pending.take() else {
            return Err(EngineError::AlreadyStarted);
        };

        let sink = match OutputSink::open(session.config()) {
            Ok(sink) => sink,
            Err(err) => {
                self.pending = Some((session, device, queue));
                return Err(err);
            }
        };

        let worker = Worker {
            pause_poll: session.config().pause_poll,
            session,
            device,
            sink,
            transport: Arc::clone(&self.transport),
            queue,
            on_visualize: self.on_visualize.take(),
            on_step_change: self.on_step_change.take(),
        };

        self.transport.running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.transport.running.store(false, Ordering::Release);
                self.finished = true;
                EngineError::RenderThread(e.to_string())
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn pause(&self) {
        self.controller.pause();
    }

    pub fn resume(&self) {
        self.controller.resume();
    }

    /// Finish the current block, join the render thread and return the
    /// result of writing the WAV container.
    pub fn stop(&mut self) -> Result<CaptureSummary> {
        if self.finished {
            return Err(EngineError::Terminated);
        }
        let Some(handle) = self.handle.take() else {
            return Err(EngineError::NotStarted);
        };
        self.finished = true;
        self.transport.running.store(false, Ordering::Release);

        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(EngineError::RenderThread("render thread panicked".to_string())),
        }
    }

    pub fn state(&self) -> TransportState {
        if self.finished {
            TransportState::Finished
        } else if self.handle.is_none() {
            TransportState::Stopped
        } else if !self.transport.running.load(Ordering::Acquire) {
            TransportState::Stopping
        } else if self.transport.paused.load(Ordering::Acquire) {
            TransportState::Paused
        } else {
            TransportState::Running
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.stop() {
                error!(error = %err, "render loop did not shut down cleanly");
            }
        }
    }
}

impl Worker {
    fn run(self) -> Result<CaptureSummary> {
        let Worker {
            mut session,
            device,
            mut sink,
            transport,
            mut queue,
            mut on_visualize,
            mut on_step_change,
            pause_poll,
        } = self;

        let mut device = output::open_or_fallback(device);
        info!(
            block_frames = session.block_frames(),
            tracks = session.track_count(),
            device = device.name(),
            "render loop running"
        );

        let mut last_step = None;
        while transport.running.load(Ordering::Acquire) {
            if transport.paused.load(Ordering::Acquire) {
                thread::sleep(pause_poll);
                continue;
            }

            while let Ok(message) = queue.pop() {
                session.apply(message);
            }

            let step = session.current_step();
            if step != last_step {
                last_step = step;
                if let (Some(step), Some(callback)) = (step, on_step_change.as_mut()) {
                    callback(step);
                }
            }

            let block = session.render_block();
            sink.capture(block);
            if let Some(callback) = on_visualize.as_mut() {
                callback(block);
            }
            if let Err(err) = device.write(block) {
                error!(device = device.name(), error = %err, "device write failed, continuing without playback");
                device = Box::new(NullDevice::new(true));
            }
            transport.blocks.fetch_add(1, Ordering::Relaxed);
        }

        if let Err(err) = device.finish() {
            warn!(error = %err, "device did not drain");
        }
        drop(device);

        debug!(
            blocks = transport.blocks.load(Ordering::Relaxed),
            bytes = sink.bytes_captured(),
            "render loop stopped"
        );
        sink.finalize()
    }
}
