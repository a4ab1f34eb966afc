//! Drive a full timed session: generate a test, answer it from stdin while
//! the countdown runs, submit, and print the score.
//!
//! Stdin commands during the answering phase:
//! `a <question> <answer>` records an answer (a single letter picks an
//! option for MCQs; free text is taken verbatim), `n`/`p`/`g <index>`
//! navigate, `s` submits after a confirmation prompt.

use clap::Args;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use url::Url;

use examsession_core::{
    format_mm_ss, AnswerCommand, Difficulty, ExamCategory, ExamSession, HttpScorer,
    HttpTestProvider, QuestionSource, SessionEvent, SessionRunner,
};

#[derive(Args)]
pub struct RunArgs {
    /// Backend base URL
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    base_url: Url,
    /// Exam category (prelims or mains)
    #[arg(long, default_value = "prelims")]
    exam: ExamCategory,
    /// Paper id; defaults to the first paper of the category
    #[arg(long)]
    paper: Option<String>,
    /// Number of questions to generate
    #[arg(long, default_value_t = 10)]
    questions: u32,
    #[arg(long, default_value = "medium")]
    difficulty: Difficulty,
    /// Question source (mock, pyq, or mixed)
    #[arg(long, default_value = "mock")]
    source: QuestionSource,
    /// Mix current-affairs context into generation
    #[arg(long)]
    current_affairs: bool,
    /// Skip the submit confirmation prompt
    #[arg(long)]
    yes: bool,
    /// Automatic scoring retries after a submission failure
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let provider = HttpTestProvider::new(args.base_url.clone());
    let scorer = HttpScorer::new(args.base_url.clone());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut runner =
        SessionRunner::new(Box::new(provider), Box::new(scorer)).with_events(event_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    {
        let session = runner.session_mut();
        session.set_exam_category(args.exam)?;
        if let Some(paper) = &args.paper {
            session.set_paper(paper)?;
        }
        session.set_question_count(args.questions)?;
        session.set_difficulty(args.difficulty)?;
        session.set_question_source(args.source)?;
        session.set_include_current_affairs(args.current_affairs)?;
    }

    let event = runner.generate().await?;
    if matches!(event, SessionEvent::GenerationFailed { .. }) {
        return Err("test generation failed".into());
    }

    print_questions(runner.session());
    let catalog = question_catalog(runner.session());

    let (command_tx, mut command_rx) = mpsc::channel(16);
    let yes = args.yes;
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(line.trim(), &catalog) {
                Some(ParsedLine::Command(command)) => {
                    if command_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Some(ParsedLine::SubmitRequested) => {
                    if yes || confirm(&mut lines).await {
                        let _ = command_tx.send(AnswerCommand::Submit).await;
                        break;
                    }
                    eprintln!("submission cancelled");
                }
                None => {
                    eprintln!("commands: a <question> <answer> | n | p | g <index> | s")
                }
            }
        }
        // Dropping the sender submits whatever has been answered.
    });

    let mut last = runner.run_answering(&mut command_rx).await?;
    reader.abort();

    let mut attempts = 0;
    while matches!(last, SessionEvent::SubmissionFailed { .. }) && attempts < args.retries {
        attempts += 1;
        eprintln!("scoring failed; retrying ({attempts}/{})", args.retries);
        last = runner.retry_submit().await?;
    }

    let report = runner.session().report().copied();
    drop(runner); // closes the event sink so the printer drains and exits
    let _ = printer.await;

    match report {
        Some(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        None => Err("session did not complete".into()),
    }
}

fn print_event(event: &SessionEvent) {
    if let SessionEvent::CountdownTick { remaining_secs, .. } = event {
        // A tick per second is too chatty; show minute marks and the
        // final stretch.
        if *remaining_secs % 60 == 0 || *remaining_secs <= 10 {
            eprintln!("time remaining: {}", format_mm_ss(*remaining_secs));
        }
        return;
    }
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

fn print_questions(session: &ExamSession) {
    let Some(test) = session.test() else { return };
    println!(
        "test {} -- {} questions, {}",
        test.test_id,
        test.len(),
        format_mm_ss(test.duration_secs)
    );
    for (number, question) in test.questions.iter().enumerate() {
        println!("{:>3}. {}", number + 1, question.prompt);
        for (letter, option) in ('a'..='z').zip(&question.options) {
            println!("      {letter}) {option}");
        }
    }
}

fn question_catalog(session: &ExamSession) -> Vec<(String, Vec<String>)> {
    session
        .test()
        .map(|test| {
            test.questions
                .iter()
                .map(|q| (q.id.clone(), q.options.clone()))
                .collect()
        })
        .unwrap_or_default()
}

enum ParsedLine {
    Command(AnswerCommand),
    SubmitRequested,
}

fn parse_line(line: &str, catalog: &[(String, Vec<String>)]) -> Option<ParsedLine> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "a" => {
            let number: usize = parts.next()?.parse().ok()?;
            let (id, options) = catalog.get(number.checked_sub(1)?)?;
            let rest = parts.collect::<Vec<_>>().join(" ");
            if rest.is_empty() {
                return None;
            }
            Some(ParsedLine::Command(AnswerCommand::Select {
                question_id: id.clone(),
                answer: resolve_answer(&rest, options),
            }))
        }
        "n" => Some(ParsedLine::Command(AnswerCommand::Next)),
        "p" => Some(ParsedLine::Command(AnswerCommand::Previous)),
        "g" => {
            let number: usize = parts.next()?.parse().ok()?;
            Some(ParsedLine::Command(AnswerCommand::GoTo(
                number.checked_sub(1)?,
            )))
        }
        "s" => Some(ParsedLine::SubmitRequested),
        _ => None,
    }
}

/// A single letter picks the corresponding option of an MCQ; anything else
/// is taken verbatim (descriptive answers, or the full option text).
fn resolve_answer(input: &str, options: &[String]) -> String {
    let mut chars = input.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        let index = (letter.to_ascii_lowercase() as usize).wrapping_sub('a' as usize);
        if let Some(option) = options.get(index) {
            return option.clone();
        }
    }
    input.to_string()
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>) -> bool {
    eprintln!("submit test? [y/N]");
    matches!(lines.next_line().await, Ok(Some(line)) if line.trim().eq_ignore_ascii_case("y"))
}
