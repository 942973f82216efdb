//! Session controller
//!
//! One task owns the [`SessionMachine`] and multiplexes control commands, the
//! one-second elapsed timer, the sample timer and the in-flight analysis
//! request. Both timers exist only while a session is active. At most one
//! analysis request is outstanding; sample ticks that find one in flight are
//! dropped, not queued.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use crate::analysis::{AnalysisGateway, AnalysisResult, SessionService};
use crate::capture::{FrameSampler, VideoSource};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AnalysisError, FormcoachError, SessionError};
use crate::overlay::{OverlayCommand, OverlayRenderer, Surface};
use crate::session::SessionMachine;
use crate::voice::Speaker;
use crate::{AppState, ControlRequest, SessionCommand};

/// External capabilities the controller drives
pub struct Collaborators {
    pub source: Arc<dyn VideoSource>,
    pub gateway: Arc<dyn AnalysisGateway>,
    pub service: Arc<dyn SessionService>,
    pub speaker: Arc<dyn Speaker>,
    pub clock: Arc<dyn Clock>,
}

/// An outstanding analysis request
struct InFlight {
    generation: u64,
    frame_size: (u32, u32),
    handle: JoinHandle<Result<AnalysisResult, AnalysisError>>,
}

#[derive(Default)]
struct Timers {
    elapsed: Option<Interval>,
    sample: Option<Interval>,
}

impl Timers {
    fn arm(&mut self, sample_period: Duration) {
        let second = Duration::from_secs(1);
        self.elapsed = Some(interval_at(Instant::now() + second, second));

        let mut sample = interval(sample_period);
        sample.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.sample = Some(sample);
    }

    fn disarm(&mut self) {
        self.elapsed = None;
        self.sample = None;
    }
}

pub struct SessionController {
    app: Arc<AppState>,
    machine: SessionMachine,
    sampler: FrameSampler,
    renderer: OverlayRenderer,
    source: Arc<dyn VideoSource>,
    gateway: Arc<dyn AnalysisGateway>,
    service: Arc<dyn SessionService>,
    sample_period: Duration,
    default_target_reps: u32,
    timers: Timers,
    in_flight: Option<InFlight>,
}

impl SessionController {
    pub fn new(app: Arc<AppState>, config: &Config, parts: Collaborators) -> Self {
        Self {
            app,
            machine: SessionMachine::new(&config.session, &config.voice, parts.speaker, parts.clock),
            sampler: FrameSampler::new(&config.capture),
            renderer: OverlayRenderer::new(config.overlay.point_radius),
            source: parts.source,
            gateway: parts.gateway,
            service: parts.service,
            sample_period: Duration::from_millis(config.session.sample_interval_ms.max(1)),
            default_target_reps: config.session.default_target_reps,
            timers: Timers::default(),
            in_flight: None,
        }
    }

    /// Run until shutdown or until every command sender is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControlRequest>) -> Result<(), FormcoachError> {
        let mut shutdown_rx = self.app.subscribe_shutdown();
        self.publish().await;

        loop {
            tokio::select! {
                request = commands.recv() => match request {
                    Some(ControlRequest { command, reply }) => {
                        let verdict = self.handle_command(command).await;
                        if let Some(reply) = reply {
                            let _ = reply.send(verdict);
                        }
                    }
                    None => {
                        tracing::info!("Command channel closed, stopping session controller");
                        break;
                    }
                },
                _ = next_tick(&mut self.timers.elapsed) => {
                    self.machine.tick_second();
                    self.publish().await;
                }
                _ = next_tick(&mut self.timers.sample) => self.sample(),
                (generation, frame_size, outcome) = join_in_flight(&mut self.in_flight) => {
                    self.complete(generation, frame_size, outcome).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session controller shutting down");
                    break;
                }
            }
        }

        if self.machine.is_active() {
            let _ = self.end_session().await;
        }
        self.timers.disarm();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }

        Ok(())
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Start { target_reps } => {
                self.start_session(target_reps.unwrap_or(self.default_target_reps))
                    .await
            }
            SessionCommand::End => self.end_session().await,
        }
    }

    async fn start_session(&mut self, target_reps: u32) -> Result<(), SessionError> {
        if let Err(e) = self.machine.start(target_reps) {
            tracing::warn!("Ignoring start request: {}", e);
            return Err(e);
        }

        self.timers.arm(self.sample_period);
        self.app.overlay.write().await.clear();

        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(e) = service.start(target_reps).await {
                tracing::warn!("Session service start notification failed: {}", e);
            }
        });

        self.publish().await;
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.machine.end() {
            tracing::warn!("Ignoring end request: {}", e);
            return Err(e);
        }

        self.timers.disarm();

        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(e) = service.end().await {
                tracing::warn!("Session service end notification failed: {}", e);
            }
        });

        self.publish().await;
        Ok(())
    }

    /// One sample tick: capture, encode and submit unless a request is
    /// already outstanding or no frame is available
    fn sample(&mut self) {
        if self.in_flight.is_some() {
            tracing::debug!("Analysis still in flight, dropping tick");
            return;
        }
        if !self.machine.is_active() {
            return;
        }

        let frame = match self.sampler.sample(self.source.as_ref()) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!("No video frame available, skipping tick");
                return;
            }
            Err(e) => {
                tracing::warn!("Frame capture failed: {}", e);
                return;
            }
        };

        let request = self.gateway.analyze(frame.payload);
        self.in_flight = Some(InFlight {
            generation: self.machine.generation(),
            frame_size: (frame.source_width, frame.source_height),
            handle: tokio::spawn(request),
        });
    }

    async fn complete(
        &mut self,
        generation: u64,
        frame_size: (u32, u32),
        outcome: Result<AnalysisResult, AnalysisError>,
    ) {
        // Release the guard whatever the outcome
        self.in_flight = None;

        match outcome {
            Ok(result) => {
                let Some(effects) = self.machine.apply_result(generation, &result) else {
                    return;
                };
                self.draw(frame_size, &effects.overlay).await;

                if effects.end_requested {
                    let _ = self.end_session().await;
                } else {
                    self.publish().await;
                }
            }
            Err(e) => {
                if self.machine.apply_failure(generation, &e) {
                    self.publish().await;
                }
            }
        }
    }

    async fn draw(&self, frame_size: (u32, u32), command: &OverlayCommand) {
        let mut canvas = self.app.overlay.write().await;
        canvas.fit_to(frame_size.0, frame_size.1);
        self.renderer.apply(&mut *canvas, command);
    }

    async fn publish(&self) {
        self.app.publish_snapshot(self.machine.snapshot()).await;
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn join_in_flight(
    slot: &mut Option<InFlight>,
) -> (u64, (u32, u32), Result<AnalysisResult, AnalysisError>) {
    match slot {
        Some(in_flight) => {
            let outcome = match (&mut in_flight.handle).await {
                Ok(outcome) => outcome,
                Err(e) => Err(AnalysisError::Aborted(e.to_string())),
            };
            (in_flight.generation, in_flight.frame_size, outcome)
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NoopSessionService;
    use crate::clock::SystemClock;
    use crate::error::SessionError;
    use crate::session::{SessionPhase, SERVER_BUSY};
    use crate::voice::FanoutSpeaker;
    use futures::future::BoxFuture;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Reports one more rep on every call, after an optional delay
    struct CountingGateway {
        calls: AtomicU32,
        delay: Duration,
    }

    impl CountingGateway {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                delay,
            }
        }
    }

    impl AnalysisGateway for CountingGateway {
        fn analyze(&self, _image: String) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(AnalysisResult {
                    rep_count: Some(n),
                    ..Default::default()
                })
            })
        }
    }

    struct FailingGateway;

    impl AnalysisGateway for FailingGateway {
        fn analyze(&self, _image: String) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>> {
            Box::pin(async { Err(AnalysisError::Status(503)) })
        }
    }

    #[derive(Default)]
    struct CountingService {
        starts: AtomicUsize,
        ends: AtomicUsize,
    }

    impl SessionService for CountingService {
        fn start(&self, _target_reps: u32) -> BoxFuture<'static, Result<(), SessionError>> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(SessionError::Service("offline".to_string())) })
        }

        fn end(&self) -> BoxFuture<'static, Result<(), SessionError>> {
            self.ends.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    fn spawn_controller(
        gateway: Arc<dyn AnalysisGateway>,
        service: Arc<dyn SessionService>,
        with_frame: bool,
    ) -> (Arc<AppState>, JoinHandle<Result<(), FormcoachError>>) {
        let config = Config::default();
        let (app, commands) = AppState::new(config.clone());
        if with_frame {
            app.frames.push(DynamicImage::new_rgb8(64, 48));
        }

        let controller = SessionController::new(
            Arc::clone(&app),
            &config,
            Collaborators {
                source: app.frames.clone(),
                gateway,
                service,
                speaker: Arc::new(FanoutSpeaker::default()),
                clock: Arc::new(SystemClock),
            },
        );

        let task = tokio::spawn(controller.run(commands));
        (app, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaching_target_ends_session_once() {
        let service = Arc::new(CountingService::default());
        let (app, task) = spawn_controller(
            Arc::new(CountingGateway::new(Duration::ZERO)),
            service.clone(),
            true,
        );

        app.send_command(SessionCommand::Start { target_reps: Some(5) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snap = app.get_snapshot().await;
        assert_eq!(snap.phase, SessionPhase::Ended);
        assert_eq!(snap.state.rep_count, 5);
        assert_eq!(service.starts.load(Ordering::SeqCst), 1);
        assert_eq!(service.ends.load(Ordering::SeqCst), 1);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_analysis_drops_ticks() {
        let gateway = Arc::new(CountingGateway::new(Duration::from_secs(2)));
        let (app, task) = spawn_controller(gateway.clone(), Arc::new(NoopSessionService), true);

        app.send_command(SessionCommand::Start { target_reps: None })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5500)).await;

        // 800ms cadence would give 7 requests without the in-flight guard
        let calls = gateway.calls.load(Ordering::SeqCst);
        assert!((2..=3).contains(&calls), "unexpected call count {}", calls);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_after_end_is_discarded() {
        let gateway = Arc::new(CountingGateway::new(Duration::from_secs(2)));
        let (app, task) = spawn_controller(gateway.clone(), Arc::new(NoopSessionService), true);

        app.send_command(SessionCommand::Start { target_reps: None })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        app.send_command(SessionCommand::End).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snap = app.get_snapshot().await;
        assert_eq!(snap.phase, SessionPhase::Ended);
        assert_eq!(snap.state.rep_count, 0);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_show_banner_and_keep_running() {
        let (app, task) = spawn_controller(Arc::new(FailingGateway), Arc::new(NoopSessionService), true);

        app.send_command(SessionCommand::Start { target_reps: Some(3) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let snap = app.get_snapshot().await;
        assert_eq!(snap.phase, SessionPhase::Active);
        assert_eq!(snap.message.as_deref(), Some(SERVER_BUSY));
        assert_eq!(snap.state.rep_count, 0);
        assert_eq!(snap.elapsed_secs, 2);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frame_means_no_requests() {
        let gateway = Arc::new(CountingGateway::new(Duration::ZERO));
        let (app, task) = spawn_controller(gateway.clone(), Arc::new(NoopSessionService), false);

        app.send_command(SessionCommand::Start { target_reps: None })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

        app.frames.push(DynamicImage::new_rgb8(32, 32));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(gateway.calls.load(Ordering::SeqCst) >= 1);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_while_active_is_ignored() {
        let service = Arc::new(CountingService::default());
        let (app, task) = spawn_controller(
            Arc::new(CountingGateway::new(Duration::ZERO)),
            service.clone(),
            false,
        );

        app.request(SessionCommand::Start { target_reps: Some(2) })
            .await
            .unwrap();
        let second = app.request(SessionCommand::Start { target_reps: Some(9) }).await;
        assert!(matches!(second, Err(SessionError::AlreadyActive)));

        let snap = app.get_snapshot().await;
        assert_eq!(snap.target_reps, 2);
        assert_eq!(service.starts.load(Ordering::SeqCst), 1);

        app.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_report_controller_verdict() {
        let (app, task) = spawn_controller(
            Arc::new(CountingGateway::new(Duration::ZERO)),
            Arc::new(NoopSessionService),
            false,
        );

        let early_end = app.request(SessionCommand::End).await;
        assert!(matches!(early_end, Err(SessionError::NotActive)));

        app.request(SessionCommand::Start { target_reps: None })
            .await
            .unwrap();
        assert_eq!(app.get_snapshot().await.phase, SessionPhase::Active);

        app.request(SessionCommand::End).await.unwrap();
        assert_eq!(app.get_snapshot().await.phase, SessionPhase::Ended);

        app.shutdown();
        task.await.unwrap().unwrap();

        let gone = app.request(SessionCommand::End).await;
        assert!(matches!(gone, Err(SessionError::ControllerGone)));
    }
}
