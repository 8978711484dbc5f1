//! Tutor CLI
//!
//! Runs one learner through the whole flow in the terminal: skill level,
//! placement quiz, score, curriculum, then the lesson loop.

mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::Console;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tutor_core::{
    AssessmentEngine, EngineConfig, FollowUpOutcome, LLMClient, LessonSequencer, LessonState,
    OpenAICompatibleClient, PromptSet, QuizSession, SkillLevel, TutorError,
    curriculum::{CurriculumSynthesizer, LLMCurriculumSynthesizer},
};

/// Adaptive language tutor
///
/// Places you with a ten-question quiz, builds a curriculum from your score,
/// and teaches it topic by topic with follow-up questions.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Skill level: a/beginner, b/intermediate or c/advanced (asked if omitted)
    #[arg(short, long, value_name = "LEVEL")]
    skill_level: Option<SkillLevel>,

    /// Language to learn (overrides TUTOR_LANGUAGE)
    #[arg(short, long)]
    language: Option<String>,

    /// Directory of prompt templates overriding the built-in ones
    #[arg(short, long, value_name = "DIR")]
    prompts: Option<PathBuf>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn). Logs go
    // to stderr so the lesson dialogue on stdout stays readable.
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let generation_failed = e
                .downcast_ref::<TutorError>()
                .is_some_and(TutorError::is_generation_failure);
            if generation_failed {
                debug!(error = %e, "Generation step failed");
                eprintln!("generation failed, try again");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = EngineConfig::from_env().context("Failed to load configuration")?;
    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(prompts) = args.prompts {
        config.prompts_path = Some(prompts);
    }

    let prompts = Arc::new(match &config.prompts_path {
        Some(path) => PromptSet::from_dir(path)
            .with_context(|| format!("Failed to load prompts from {}", path.display()))?,
        None => PromptSet::default(),
    });
    let client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::from_engine_config(&config));
    info!(provider = ?config.provider, model = %config.chat_model, language = %config.language, "Tutor configured");

    let mut console = Console::new(BufReader::new(tokio::io::stdin()));
    println!("Welcome to your {} tutor!", config.language);

    let skill_level = match args.skill_level {
        Some(level) => level,
        None => match console.ask_skill_level().await? {
            Some(level) => level,
            None => return Ok(()),
        },
    };

    // --- Placement quiz ---
    println!("\nGenerating your {} quiz...", skill_level);
    let engine = AssessmentEngine::new(client.clone(), prompts.clone(), config.language.clone());
    let questions = engine.generate_quiz(skill_level).await?;
    let Some(quiz) = take_quiz(&mut console, QuizSession::new(skill_level, questions)).await? else {
        println!("\nGoodbye!");
        return Ok(());
    };
    let result = quiz.result();
    println!(
        "\nYou scored {}/{} ({}%).",
        result.score, result.total, result.percentage
    );

    // --- Curriculum ---
    println!("\nBuilding your personalized curriculum...");
    let synthesizer = LLMCurriculumSynthesizer::new(client.clone(), prompts.clone());
    let curriculum = synthesizer
        .synthesize(skill_level, result.percentage, &config.language)
        .await?;
    println!("\nYour personalized curriculum:");
    println!("{}", serde_json::to_string_pretty(&curriculum)?);

    // --- Lessons ---
    let mut sequencer = LessonSequencer::new(client, prompts, config.language.clone(), curriculum)
        .with_progression(quiz.into_progression());
    sequencer.start()?;
    teach(&mut console, &mut sequencer).await?;

    let completed = &sequencer.progression().completed_topics;
    match sequencer.state() {
        LessonState::Completed => {
            println!("\nCongratulations! You have completed all lessons.")
        }
        _ => println!(
            "\nGoodbye! You completed {} topic(s): {}",
            completed.len(),
            completed.join(", ")
        ),
    }
    Ok(())
}

/// Walks through the quiz with per-question feedback. `None` if the
/// learner closed the input before finishing.
async fn take_quiz<R: AsyncBufRead + Unpin>(
    console: &mut Console<R>,
    mut quiz: QuizSession,
) -> anyhow::Result<Option<QuizSession>> {
    let total = quiz.questions.len();
    while let Some(question) = quiz.current() {
        println!("\nQuestion {}/{}: {}", quiz.position() + 1, total, question.text);
        for (label, choice) in &question.choices {
            println!("  {}) {}", label, choice);
        }
        let Some(answer) = console.ask_option().await? else {
            return Ok(None);
        };
        let feedback = quiz.submit(answer)?;
        if feedback.correct {
            println!("Correct!");
        } else {
            println!("Incorrect. The correct answer was {}.", feedback.correct_answer);
        }
    }
    Ok(Some(quiz))
}

/// Drives the sequencer until it reaches a terminal state. Closing the
/// input quits.
async fn teach<R: AsyncBufRead + Unpin>(
    console: &mut Console<R>,
    sequencer: &mut LessonSequencer,
) -> anyhow::Result<()> {
    while !sequencer.is_finished() {
        match sequencer.state() {
            LessonState::LessonPresented { .. } => {
                let lesson = sequencer.present_lesson().await?;
                println!("\n=== {} ===\n{}", lesson.topic, lesson.content);
            }
            LessonState::FollowUpPending { .. } => {
                let question = sequencer.present_follow_up()?.question.clone();
                let Some(answer) = console.ask(&format!("\n{}", question)).await? else {
                    sequencer.quit();
                    break;
                };
                match sequencer.answer_follow_up(&answer).await? {
                    FollowUpOutcome::Correct { .. } => println!("Correct!"),
                    FollowUpOutcome::Incorrect { question, .. } => {
                        println!("Incorrect. The correct answer is: {}", question.correct_answer);
                        println!("Explanation: {}", question.explanation);
                        if !question.study_recommendation.is_empty() {
                            println!("Study recommendation: {}", question.study_recommendation);
                        }
                        println!("\nLet's try a more focused question.");
                    }
                }
            }
            LessonState::Remediation { .. } => {
                let question = sequencer.present_remediation()?.question.clone();
                let Some(answer) = console.ask(&format!("\n{}", question)).await? else {
                    sequencer.quit();
                    break;
                };
                let outcome = sequencer.answer_remediation(&answer)?;
                if outcome.correct {
                    println!("Correct! Great job.");
                } else {
                    println!(
                        "Not quite. The correct answer is: {}",
                        outcome.focused.correct_answer
                    );
                    println!("Explanation: {}", outcome.focused.explanation);
                }
            }
            LessonState::Advancing { .. } => {
                let Some(command) = console.ask_navigation().await? else {
                    sequencer.quit();
                    break;
                };
                sequencer.advance(command)?;
            }
            LessonState::Idle | LessonState::Completed | LessonState::Quit => break,
        }
    }
    Ok(())
}
