//! Headless session runner implementation.
//!
//! [`HeadlessRunner`] owns the simulation and the chat log and turns each
//! [`Command`] into responses synchronously. [`serve`] wraps it in a
//! single-threaded `tokio` loop that multiplexes stdin lines, the optional
//! real-time frame clock and finished examine requests.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use voxelscape_core::combat::{Dice, SeededDice};
use voxelscape_core::config::SimConfig;
use voxelscape_core::examine::{self, ExamineError, ExamineRequest};
use voxelscape_core::math::{Fixed, Vec2Fixed};
use voxelscape_core::messages::MessageLog;
use voxelscape_core::session::{CommandOutcome, RejectReason};
use voxelscape_core::simulation::Simulation;

use crate::examine_client::ExamineClient;
use crate::protocol::{Command, EnemyView, PatchView, PlayerView, Response, StateView, MAX_ADVANCE_MS};

/// Settings for a `run` session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Simulation tunables.
    pub config: SimConfig,
    /// Dice seed.
    pub seed: u64,
    /// Follow wall time instead of waiting for `advance`.
    pub realtime: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: SimConfig::default(),
            seed: 0,
            realtime: false,
        }
    }
}

impl RunOptions {
    /// Options with the config read from `path`, or the defaults.
    pub fn load(path: Option<&Path>, seed: u64, realtime: bool) -> voxelscape_core::error::Result<Self> {
        let config = match path {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        Ok(Self {
            config,
            seed,
            realtime,
        })
    }
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything produced by one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Lines to write, in order.
    pub responses: Vec<Response>,
    /// Flavor text to fetch in the background.
    pub examine: Option<ExamineRequest>,
    pub flow: Flow,
}

impl Reply {
    fn new(responses: Vec<Response>) -> Self {
        Self {
            responses,
            examine: None,
            flow: Flow::Continue,
        }
    }
}

/// Headless runner for controller-driven sessions.
pub struct HeadlessRunner<D: Dice = SeededDice> {
    sim: Simulation<D>,
    log: MessageLog,
}

impl HeadlessRunner<SeededDice> {
    /// Runner over a fresh seeded simulation.
    pub fn with_seed(config: SimConfig, seed: u64) -> voxelscape_core::error::Result<Self> {
        Ok(Self::new(Simulation::with_seed(config, seed)?))
    }
}

impl<D: Dice> HeadlessRunner<D> {
    /// Wrap an existing simulation.
    pub fn new(sim: Simulation<D>) -> Self {
        let log = MessageLog::new(sim.session().config().message_history);
        Self { sim, log }
    }

    /// The driven simulation.
    pub fn simulation(&self) -> &Simulation<D> {
        &self.sim
    }

    /// Mutable access for scripted setups.
    pub fn simulation_mut(&mut self) -> &mut Simulation<D> {
        &mut self.sim
    }

    /// Retained chat log.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// The line announcing the runner.
    pub fn ready(&self) -> Response {
        Response::ready(self.sim.now_ms())
    }

    /// Stop all cadences.
    pub fn shutdown(&mut self) {
        self.sim.shutdown();
    }

    /// Parse and handle one input line. Parse failures become `error`
    /// responses; blank lines produce nothing.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        let line = line.trim();
        if line.is_empty() {
            return Reply::new(Vec::new());
        }

        match Command::from_json(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                tracing::debug!(error = %e, "Unparseable command");
                Reply::new(vec![Response::error(format!("Parse error: {e}"), None)])
            }
        }
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: Command) -> Reply {
        let cmd_name = cmd.name();
        tracing::debug!(cmd = cmd_name, now_ms = self.sim.now_ms(), "Handling command");

        let mut reply = Reply::new(Vec::new());
        match cmd {
            Command::Advance { ms } => {
                let ms = ms.unwrap_or(self.sim.session().config().combat_tick_ms);
                if ms > MAX_ADVANCE_MS {
                    reply.responses.push(Response::error(
                        format!("Advance of {ms} ms exceeds the {MAX_ADVANCE_MS} ms limit"),
                        Some(cmd_name),
                    ));
                } else {
                    let events = self.sim.advance(ms);
                    reply.responses.push(Response::Events {
                        now_ms: self.sim.now_ms(),
                        events,
                    });
                }
            }

            Command::Move { x, z } => match (Fixed::checked_from_num(x), Fixed::checked_from_num(z)) {
                (Some(x), Some(z)) => {
                    let outcome = self.sim.session_mut().move_player_to(Vec2Fixed::new(x, z));
                    reply.responses.push(outcome_response(cmd_name, outcome));
                }
                _ => {
                    reply
                        .responses
                        .push(Response::error(format!("Coordinates out of range: ({x}, {z})"), Some(cmd_name)));
                }
            },

            Command::Attack { enemy_id } => {
                let outcome = self.sim.session_mut().issue_attack(enemy_id);
                reply.responses.push(outcome_response(cmd_name, outcome));
            }

            Command::Interact { patch_id } => {
                let outcome = self.sim.session_mut().interact_with_patch(patch_id);
                reply.responses.push(outcome_response(cmd_name, outcome));
            }

            Command::Examine { patch_id } => match self.sim.session_mut().examine_patch(patch_id) {
                Some(request) => {
                    reply.responses.push(Response::ack(cmd_name));
                    reply.examine = Some(request);
                }
                None => reply.responses.push(outcome_response(
                    cmd_name,
                    CommandOutcome::Rejected(RejectReason::UnknownPatch(patch_id)),
                )),
            },

            Command::ExamineEnemy { enemy_id } => match self.sim.session_mut().examine_enemy(enemy_id) {
                Some(request) => {
                    reply.responses.push(Response::ack(cmd_name));
                    reply.examine = Some(request);
                }
                None => reply.responses.push(outcome_response(
                    cmd_name,
                    CommandOutcome::Rejected(RejectReason::UnknownEnemy(enemy_id)),
                )),
            },

            Command::Query => {
                reply.responses.push(Response::State(Box::new(self.state_view())));
            }

            Command::Messages => {
                reply.responses.push(Response::Messages {
                    messages: self.log.iter().cloned().collect(),
                });
            }

            Command::Hash => {
                reply.responses.push(Response::Hash {
                    now_ms: self.sim.now_ms(),
                    hash: self.sim.state_hash(),
                });
            }

            Command::Quit => {
                reply.responses.push(Response::Bye);
                reply.flow = Flow::Quit;
            }
        }

        self.flush_messages(&mut reply.responses);
        reply
    }

    /// Let wall time pass. Quiet unless something happened.
    pub fn elapse(&mut self, ms: u64) -> Vec<Response> {
        let mut responses = Vec::new();
        if ms == 0 {
            return responses;
        }

        let events = self.sim.advance(ms);
        if !events.is_empty() {
            responses.push(Response::Events {
                now_ms: self.sim.now_ms(),
                events,
            });
        }
        self.flush_messages(&mut responses);
        responses
    }

    /// Record the outcome of an examine request.
    pub fn finish_examine(&mut self, object: &str, result: Result<String, ExamineError>) -> Vec<Response> {
        let text = examine::resolve(object, result);
        self.sim.session_mut().record_examine(text);

        let mut responses = Vec::new();
        self.flush_messages(&mut responses);
        responses
    }

    /// Full state for a `query`.
    pub fn state_view(&self) -> StateView {
        let session = self.sim.session();
        let levels = session.skill_levels();
        StateView {
            now_ms: self.sim.now_ms(),
            ticks: self.sim.tick_count(),
            player: PlayerView::from(session.player()),
            target: session.active_target(),
            levels,
            total_level: levels.total(),
            enemies: session.enemies().map(EnemyView::from).collect(),
            patches: session.patches().map(PatchView::from).collect(),
            hash: self.sim.state_hash(),
        }
    }

    fn flush_messages(&mut self, responses: &mut Vec<Response>) {
        let messages = self.sim.session_mut().drain_messages();
        if messages.is_empty() {
            return;
        }
        self.log.extend(messages.iter().cloned());
        responses.push(Response::Messages { messages });
    }
}

fn outcome_response(cmd: &str, outcome: CommandOutcome) -> Response {
    match outcome {
        CommandOutcome::Accepted => Response::ack(cmd),
        CommandOutcome::Redirected => Response::Ack {
            cmd: cmd.to_string(),
            redirected: true,
        },
        CommandOutcome::Rejected(reason) => Response::Rejected {
            cmd: cmd.to_string(),
            reason,
        },
    }
}

fn write_responses<W: Write>(out: &mut W, responses: &[Response]) -> io::Result<()> {
    for response in responses {
        out.write_all(response.to_json_line().as_bytes())?;
    }
    out.flush()
}

/// Drive `runner` from JSON lines on `input`, writing responses to `out`.
///
/// Returns after `quit`, or once input is closed and every pending examine
/// request has reported back. With `realtime`, a frame-rate interval feeds
/// elapsed wall time into the simulation between commands.
pub async fn serve<D, R, W>(
    runner: &mut HeadlessRunner<D>,
    input: R,
    out: &mut W,
    client: ExamineClient,
    realtime: bool,
) -> io::Result<()>
where
    D: Dice,
    R: tokio::io::AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<(String, Result<String, ExamineError>)>();
    let mut pending_examines = 0usize;
    let mut input_open = true;

    let frame = Duration::from_millis(runner.simulation().session().config().frame_ms.max(1));
    let mut frames = tokio::time::interval(frame);
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_frame = Instant::now();

    write_responses(out, &[runner.ready()])?;
    tracing::info!(realtime, "Session ready");

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    tracing::debug!(pending_examines, "Input closed");
                    input_open = false;
                    if pending_examines == 0 {
                        break;
                    }
                    continue;
                };

                let reply = runner.handle_line(&line);
                write_responses(out, &reply.responses)?;

                if let Some(request) = reply.examine {
                    pending_examines += 1;
                    let client = client.clone();
                    let results_tx = results_tx.clone();
                    tokio::spawn(async move {
                        let result = client.describe(&request).await;
                        // Receiver gone means the session already ended.
                        let _ = results_tx.send((request.object, result));
                    });
                }

                if reply.flow == Flow::Quit {
                    break;
                }
            }

            Some((object, result)) = results_rx.recv() => {
                pending_examines = pending_examines.saturating_sub(1);
                let responses = runner.finish_examine(&object, result);
                write_responses(out, &responses)?;
                if !input_open && pending_examines == 0 {
                    break;
                }
            }

            _ = frames.tick(), if realtime => {
                let elapsed = u64::try_from(last_frame.elapsed().as_millis()).unwrap_or(u64::MAX);
                last_frame += Duration::from_millis(elapsed);
                let responses = runner.elapse(elapsed);
                write_responses(out, &responses)?;
            }
        }
    }

    runner.shutdown();
    tracing::info!(now_ms = runner.simulation().now_ms(), "Session ended");
    Ok(())
}

/// Run a session on stdin/stdout until `quit` or end of input.
pub fn run(options: RunOptions) -> Result<(), RunError> {
    let mut runner = HeadlessRunner::with_seed(options.config, options.seed)?;
    let client = ExamineClient::from_env();

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = io::stdout();
        serve(&mut runner, stdin, &mut stdout, client, options.realtime).await
    })?;
    Ok(())
}

/// Why a session could not run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The simulation could not be built.
    #[error(transparent)]
    Setup(#[from] voxelscape_core::error::GameError),
    /// Reading commands or writing responses failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
