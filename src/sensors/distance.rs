//! HC-SR04 distance sensor: measurement task and consumer API.
//!
//! ```text
//!         ┌──────────────── one cycle ─────────────────┐
//!   Trigger ──▶ Await-Echo ──▶ Compute ──▶ Publish ──▶ Idle(interval)
//!                  │ timeout                  ▲
//!                  └──── Timeout reading ─────┘
//! ```
//!
//! The task owns the trigger pin, the delay provider, the raw-queue
//! consumer and the smoothing filter.  Consumers only see the processed
//! channel, through [`DistanceSensor`] itself or a cloned
//! [`MeasurementReader`].

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use futures_lite::future;
use log::{debug, error, info, warn};

use super::channels::{EchoReceiver, ProcessedChannel};
use super::ema::EmaFilter;
use super::measurement::{MeasurementStatus, ProcessedMeasurement, RawMeasurement};
use super::ranging;
use crate::config::SensorConfig;
use crate::drivers::task_pin::{self, Core};
use crate::error::{Error, Result};
use crate::pins;
use crate::ports::MonotonicClock;

/// How often a blocked reader re-checks that the task is still running.
const READER_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ── Shared state ──────────────────────────────────────────────

struct Shared {
    processed: ProcessedChannel,
    running: AtomicBool,
    stop_requested: AtomicBool,
    stop: Signal<CriticalSectionRawMutex, ()>,
}

// ── Measurement task ──────────────────────────────────────────

/// Everything the measurement thread owns.  Handed back through the join
/// handle on stop so the sensor can be restarted.
struct MeasurementTask<P, D, C> {
    trigger: P,
    delay: D,
    clock: C,
    echo: EchoReceiver,
    config: SensorConfig,
}

impl<P, D, C> MeasurementTask<P, D, C>
where
    P: OutputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    fn run(mut self, shared: &Shared) -> Self {
        // Fixed for the lifetime of this run; temperature is not re-read.
        let speed = ranging::speed_of_sound_mm_per_s(self.config.temperature_tenths_c);
        let mut filter = EmaFilter::new(self.config.smoothing_factor);
        let timeout = Duration::from_millis(u64::from(self.config.timeout_ms));
        let interval = Duration::from_millis(u64::from(self.config.measurement_interval_ms));

        info!(
            "measurement task running (speed={} mm/s, interval={:?}, timeout={:?})",
            speed, interval, timeout
        );

        while !shared.stop_requested.load(Ordering::Acquire) {
            self.discard_stale();
            self.trigger_pulse();

            let reading = match self.await_echo(timeout) {
                Some(raw) => {
                    let r = ranging::evaluate(&raw, speed, &mut filter);
                    match r.status {
                        MeasurementStatus::Ok => debug!("distance {} mm", r.distance_mm),
                        MeasurementStatus::OutOfRange => {
                            warn!("distance out of range: {} mm", r.distance_mm);
                        }
                        other => warn!("discarded echo: {:?}", other),
                    }
                    r
                }
                None => {
                    warn!("no echo within {:?}", timeout);
                    ProcessedMeasurement::timeout(self.clock.now_us())
                }
            };

            if shared.stop_requested.load(Ordering::Acquire) {
                break;
            }
            shared.processed.publish(reading);

            if idle(interval, &shared.stop) {
                break;
            }
        }

        info!("measurement task exiting");
        self
    }

    /// Drop samples left behind by an echo that arrived after a timeout.
    fn discard_stale(&mut self) {
        let dropped = self.echo.discard_all();
        if dropped > 0 {
            debug!("discarded {} stale echo sample(s)", dropped);
        }
    }

    fn trigger_pulse(&mut self) {
        if let Err(e) = self.pulse() {
            // The cycle still runs and reports a timeout.
            error!("trigger pulse failed: {:?}", e);
        }
    }

    fn pulse(&mut self) -> core::result::Result<(), P::Error> {
        self.trigger.set_low()?;
        self.delay.delay_us(pins::TRIGGER_SETTLE_US);
        self.trigger.set_high()?;
        self.delay.delay_us(pins::TRIGGER_PULSE_US);
        self.trigger.set_low()
    }

    fn await_echo(&mut self, timeout: Duration) -> Option<RawMeasurement> {
        let echo = &mut self.echo;
        future::block_on(future::or(
            async move { Some(echo.receive().await) },
            async move {
                async_io_mini::Timer::after(timeout).await;
                None
            },
        ))
    }
}

/// Sleep for `interval`.  Returns `true` if a stop was requested.
fn idle(interval: Duration, stop: &Signal<CriticalSectionRawMutex, ()>) -> bool {
    future::block_on(future::or(
        async {
            stop.wait().await;
            true
        },
        async {
            async_io_mini::Timer::after(interval).await;
            false
        },
    ))
}

// ── Sensor ────────────────────────────────────────────────────

enum TaskSlot<P, D, C> {
    Idle(MeasurementTask<P, D, C>),
    Running(JoinHandle<MeasurementTask<P, D, C>>),
    /// The task thread panicked; its resources are gone.
    Lost,
}

/// Ultrasonic distance sensor with a background measurement task.
///
/// Created stopped.  [`start`](Self::start) launches the task;
/// [`stop`](Self::stop) (or drop) ends it.
pub struct DistanceSensor<P, D, C>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
    C: MonotonicClock + Send + 'static,
{
    shared: Arc<Shared>,
    slot: TaskSlot<P, D, C>,
    last_overflow_count: u32,
}

impl<P, D, C> DistanceSensor<P, D, C>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
    C: MonotonicClock + Send + 'static,
{
    /// Build a stopped sensor.
    ///
    /// `echo` is the receiving half of [`echo_link`](super::echo_capture::echo_link);
    /// the other half must be attached to the echo pin
    /// (`drivers::hw_init::install_echo_isr` on device,
    /// [`SimEcho`](super::sim::SimEcho) on the host).
    pub fn new(
        config: SensorConfig,
        trigger: P,
        delay: D,
        clock: C,
        echo: EchoReceiver,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            "distance sensor ready (trigger=GPIO{}, echo=GPIO{})",
            config.trigger_pin, config.echo_pin
        );

        let task = MeasurementTask {
            trigger,
            delay,
            clock,
            echo,
            config,
        };
        let sensor = Self {
            shared: Arc::new(Shared {
                processed: ProcessedChannel::new(),
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                stop: Signal::new(),
            }),
            slot: TaskSlot::Idle(task),
            last_overflow_count: 0,
        };
        Ok(sensor)
    }

    /// Launch the measurement task.  Each launch starts with a fresh filter.
    pub fn start(&mut self) -> Result<()> {
        let task = match core::mem::replace(&mut self.slot, TaskSlot::Lost) {
            TaskSlot::Idle(task) => task,
            other => {
                self.slot = other;
                return Err(Error::InvalidState);
            }
        };

        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.stop.reset();
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        // The closure owns the task; if spawning fails it is dropped with it.
        let spawned = task_pin::spawn_on_core(
            Core::App,
            pins::MEASUREMENT_TASK_PRIORITY,
            pins::MEASUREMENT_TASK_STACK_KB,
            "ranging\0",
            move || {
                let task = task.run(&shared);
                shared.running.store(false, Ordering::Release);
                task
            },
        );

        match spawned {
            Ok(handle) => {
                self.slot = TaskSlot::Running(handle);
                info!("measurement task started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                error!("failed to spawn measurement task: {}", e);
                Err(e)
            }
        }
    }

    /// Stop the task and wait for it to exit.
    ///
    /// An in-flight cycle is abandoned; its reading is never published.
    pub fn stop(&mut self) -> Result<()> {
        let handle = match core::mem::replace(&mut self.slot, TaskSlot::Lost) {
            TaskSlot::Running(handle) => handle,
            other => {
                self.slot = other;
                return Err(Error::InvalidState);
            }
        };

        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.stop.signal(());

        match handle.join() {
            Ok(task) => {
                self.slot = TaskSlot::Idle(task);
                info!("measurement task stopped");
                Ok(())
            }
            Err(_) => {
                self.shared.running.store(false, Ordering::Release);
                error!("measurement task panicked; sensor cannot be restarted");
                Err(Error::InvalidState)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Block until a processed reading is available and return it.
    ///
    /// Fails with `InvalidState` once the task is not running and nothing
    /// is queued, including for a caller already blocked when the task
    /// stops.
    pub fn get_latest(&self) -> Result<ProcessedMeasurement> {
        self.reader().get_latest()
    }

    pub fn has_new_measurement(&self) -> bool {
        !self.shared.processed.is_empty()
    }

    pub fn overflow_count(&self) -> u32 {
        self.shared.processed.overflow_count()
    }

    /// Handle for consumers on other tasks.
    pub fn reader(&self) -> MeasurementReader {
        MeasurementReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Periodic health check: report overflows since the previous call.
    pub fn monitor(&mut self) -> Result<()> {
        if !self.is_running() {
            warn!("monitor: measurement task not running");
            return Err(Error::InvalidState);
        }
        let total = self.overflow_count();
        let delta = total.wrapping_sub(self.last_overflow_count);
        if delta > 0 {
            warn!(
                "monitor: {} processed-channel overflow(s) since last check (total={})",
                delta, total
            );
        }
        self.last_overflow_count = total;
        Ok(())
    }
}

impl<P, D, C> Drop for DistanceSensor<P, D, C>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
    C: MonotonicClock + Send + 'static,
{
    fn drop(&mut self) {
        if matches!(self.slot, TaskSlot::Running(_)) {
            if let Err(e) = self.stop() {
                warn!("distance sensor drop: stop failed: {}", e);
            }
        }
    }
}

// ── Reader handle ─────────────────────────────────────────────

/// Cloneable consumer-side view of the processed channel.
#[derive(Clone)]
pub struct MeasurementReader {
    shared: Arc<Shared>,
}

impl MeasurementReader {
    /// See [`DistanceSensor::get_latest`].
    pub fn get_latest(&self) -> Result<ProcessedMeasurement> {
        let processed = &self.shared.processed;
        loop {
            if let Some(r) = processed.try_receive() {
                return Ok(r);
            }
            if !self.shared.running.load(Ordering::Acquire) {
                // The task may have published its last reading just before
                // it stopped.
                return processed.try_receive().ok_or(Error::InvalidState);
            }
            let received = future::block_on(future::or(
                async { Some(processed.receive().await) },
                async {
                    async_io_mini::Timer::after(READER_POLL_INTERVAL).await;
                    None
                },
            ));
            if let Some(r) = received {
                return Ok(r);
            }
        }
    }

    pub fn has_new_measurement(&self) -> bool {
        !self.shared.processed.is_empty()
    }

    pub fn overflow_count(&self) -> u32 {
        self.shared.processed.overflow_count()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}
