//! Line-oriented terminal host for a workout session.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use services::{
    AnswerOutcome, AppServices, HistoryService, ObserverFactory, SessionObserver,
    SessionService, Transition,
};
use strength_core::TickOutcome;
use strength_core::model::{LoggedSet, SessionPhase, SessionRecord, WorkoutPlan, is_valid_weight};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

type HostResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Rings the terminal bell when rest is over.
pub struct TerminalObserver;

impl SessionObserver for TerminalObserver {
    fn rest_elapsed(&mut self, _record: &SessionRecord) {
        print!("\x07");
        println!("Rest is over. Type `next` to continue.");
        let _ = std::io::stdout().flush();
    }

    fn set_redone(&mut self, record: &SessionRecord) {
        println!(
            "Set {} discarded. Enter your reps again and type `done`.",
            record.set_number
        );
    }
}

pub fn observer_factory() -> ObserverFactory {
    Arc::new(|| Box::new(TerminalObserver) as Box<dyn SessionObserver>)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Input {
    Reps(i32),
    Weight(f64),
    Done,
    Answer(bool),
    Next,
    Redo,
    Pause,
    Resume,
    Status,
    Reset,
    Help,
    Quit,
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        match lower.as_str() {
            "done" | "d" => return Some(Self::Done),
            "y" | "yes" | "true" | "t" => return Some(Self::Answer(true)),
            "n" | "no" | "false" | "f" => return Some(Self::Answer(false)),
            "next" | "" => return Some(Self::Next),
            "redo" => return Some(Self::Redo),
            "pause" | "p" => return Some(Self::Pause),
            "resume" | "r" => return Some(Self::Resume),
            "status" | "s" => return Some(Self::Status),
            "reset" => return Some(Self::Reset),
            "help" | "?" => return Some(Self::Help),
            "quit" | "q" | "exit" => return Some(Self::Quit),
            _ => {}
        }
        if let Some(raw) = lower
            .strip_prefix("weight")
            .or_else(|| lower.strip_prefix('w'))
        {
            return raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|lbs| is_valid_weight(*lbs))
                .map(Self::Weight);
        }
        match line {
            "+" => Some(Self::Reps(1)),
            "-" => Some(Self::Reps(-1)),
            _ => line
                .strip_prefix('+')
                .unwrap_or(line)
                .parse::<i32>()
                .ok()
                .filter(|_| line.starts_with(['+', '-']))
                .map(Self::Reps),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  + / -       add or remove one rep   (+3, -2 for more)");
    println!("  w <lbs>     set the bar weight for this exercise");
    println!("  done        finish the set and start resting");
    println!("  y / n       answer the question true or false");
    println!("  next        move on once the rest gate is open (Enter works too)");
    println!("  redo        redo the set right away after a wrong answer");
    println!("  pause       hold the rest timer   (`resume` to continue)");
    println!("  status      show where you are");
    println!("  reset       start this workout over");
    println!("  quit        leave; progress is saved");
}

fn format_lbs(lbs: f64) -> String {
    format!("{lbs} lbs")
}

fn last_workout_line(reps: Option<u32>, weight: Option<f64>) -> Option<String> {
    match (reps, weight) {
        (Some(reps), Some(lbs)) => Some(format!("Last workout: {reps} reps @ {}", format_lbs(lbs))),
        (Some(reps), None) => Some(format!("Last workout: {reps} reps")),
        (None, Some(lbs)) => Some(format!("Last workout: {}", format_lbs(lbs))),
        (None, None) => None,
    }
}

fn format_set(set: &LoggedSet) -> String {
    match set.weight {
        Some(lbs) => format!("{}@{lbs}", set.reps),
        None => set.reps.to_string(),
    }
}

async fn render(sessions: &SessionService, history: &HistoryService) -> HostResult<()> {
    let (Some(progress), Some(record)) = (sessions.progress().await, sessions.snapshot().await)
    else {
        return Ok(());
    };
    println!();
    println!(
        "Exercise {}/{}: {}  Set {}/{}  Target {} reps",
        progress.exercise_number,
        progress.exercise_count,
        progress.exercise_name,
        progress.set_number,
        progress.target_sets,
        progress.target_reps,
    );
    let name = progress.exercise_name.as_str();
    let last = last_workout_line(
        history.last_reps_for(name).await?,
        history.last_weight_for(name).await?,
    );
    if let Some(line) = last {
        println!("{line}");
    }
    match record.phase {
        SessionPhase::Input => {
            let weight = record
                .weight_entered
                .map_or_else(|| "not set".to_owned(), format_lbs);
            println!(
                "Reps: {}   Weight: {weight}   (+/- to adjust, `done` when finished)",
                record.reps_entered
            );
        }
        SessionPhase::Resting => {
            println!(
                "Resting: {}s of {}s left",
                record.clock.time_left_secs(),
                record.clock.total_secs()
            );
            if let Some(question) = &record.question {
                match record.answered_correctly() {
                    None => println!("True or false? {}  (y/n)", question.prompt),
                    Some(true) => println!("Answered correctly. `next` when ready."),
                    Some(false) => println!("Wrong answer. The set will be redone."),
                }
            }
        }
        SessionPhase::Complete => println!("Workout complete."),
    }
    Ok(())
}

async fn answer(sessions: &SessionService, value: bool) -> HostResult<()> {
    let question = sessions.snapshot().await.and_then(|record| record.question);
    match sessions.answer_question(value).await? {
        AnswerOutcome::Correct => println!("Correct."),
        AnswerOutcome::Incorrect { redo_after, .. } => {
            println!(
                "Wrong. Redoing this set in {}s (or type `redo`).",
                redo_after.as_secs()
            );
        }
        AnswerOutcome::Ignored => {
            println!("Nothing to answer right now.");
            return Ok(());
        }
    }
    if let Some(explanation) = question.and_then(|q| q.explanation) {
        println!("{explanation}");
    }
    Ok(())
}

/// Returns `true` when the session loop should stop.
async fn handle(sessions: &SessionService, input: Input) -> HostResult<bool> {
    let transition = match input {
        Input::Reps(delta) => sessions.adjust_reps(delta).await?,
        Input::Weight(lbs) => sessions.set_weight(lbs).await?,
        Input::Done => sessions.complete_set().await?,
        Input::Answer(value) => {
            answer(sessions, value).await?;
            return Ok(false);
        }
        Input::Next => {
            let transition = sessions.advance_set().await?;
            let finished = sessions
                .snapshot()
                .await
                .is_some_and(|record| record.is_complete());
            if finished {
                if let Some(entry) = sessions.complete_workout().await? {
                    println!(
                        "{} logged: {} reps in total.",
                        entry.plan_name,
                        entry.total_reps()
                    );
                }
                return Ok(false);
            }
            transition
        }
        Input::Redo => sessions.redo_set().await?,
        Input::Pause => sessions.pause_rest().await?,
        Input::Resume => sessions.resume_rest().await?,
        Input::Status => Transition::Applied,
        Input::Reset => {
            sessions.reset_progress().await?;
            println!("Progress reset. Run again to start the workout over.");
            return Ok(true);
        }
        Input::Help => {
            print_help();
            return Ok(false);
        }
        Input::Quit => return Ok(true),
    };

    if transition == Transition::Ignored {
        println!("Not now.");
    }
    Ok(false)
}

/// Runs one workout until it is completed or the user quits.
///
/// # Errors
///
/// Returns an error when the session cannot be persisted or stdin fails.
pub async fn run_workout(app: &AppServices, plan: WorkoutPlan) -> HostResult<()> {
    let sessions = app.sessions();
    let history = app.history();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    sessions
        .bind_plan(
            plan.clone(),
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .await?;

    println!("{}", plan.name());
    print_help();
    render(&sessions, &history).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(input) = Input::parse(&line) else {
                    println!("Unknown command `{}`. Type `help`.", line.trim());
                    continue;
                };
                if handle(&sessions, input).await? {
                    break;
                }
                render(&sessions, &history).await?;
            }
            _ = ticker.tick() => {
                if !sessions.needs_ticks().await {
                    continue;
                }
                if let TickOutcome::Running { time_left_secs } = sessions.tick().await? {
                    if time_left_secs % 30 == 0 {
                        println!("{time_left_secs}s of rest left");
                    }
                }
            }
            Some(()) = done_rx.recv() => {
                println!("Great work. See you next session.");
                break;
            }
        }
    }
    Ok(())
}

/// Prints every recorded workout, oldest first.
///
/// # Errors
///
/// Returns an error when history cannot be read.
pub async fn print_history(app: &AppServices) -> HostResult<()> {
    let entries = app.history().list().await?;
    if entries.is_empty() {
        println!("No workouts recorded yet.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}",
            entry.completed_at.format("%Y-%m-%d %H:%M"),
            entry.plan_name
        );
        for exercise in &entry.exercises {
            let sets: Vec<String> = exercise.sets.iter().map(format_set).collect();
            println!("    {:<14} {}", exercise.name, sets.join(" / "));
        }
    }
    Ok(())
}
