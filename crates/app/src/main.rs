use std::fmt;
use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{
    Choice, ChoiceId, ChoiceLabel, Difficulty, Exam, ExamId, Question, QuestionId, QuestionKind,
    Section, SectionId, TestCode,
};
use gateway::{ExamGateway, HttpGateway, InMemoryGateway};
use services::AttemptFlow;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod runner;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidCode { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidCode { raw } => write!(f, "invalid --code value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take [--exam-id <id>] [--code <6 digits>]");
    eprintln!("  cargo run -p app -- demo [--code <6 digits>]");
    eprintln!();
    eprintln!("take runs against the exam backend configured in the environment;");
    eprintln!("demo runs the same flow against a built-in practice test.");
    eprintln!();
    eprintln!("Defaults for take:");
    eprintln!("  --exam-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_API_URL, EXAM_API_TOKEN, EXAM_HTTP_TIMEOUT_SECS, EXAM_ID");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    exam_id: ExamId,
    code: Option<TestCode>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut exam_id = std::env::var("EXAM_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| ExamId::new(1), ExamId::new);
        let mut code = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--exam-id" => {
                    let value = require_value(args, "--exam-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                    exam_id = ExamId::new(parsed);
                }
                "--code" => {
                    let value = require_value(args, "--code")?;
                    let parsed = TestCode::new(&value)
                        .map_err(|_| ArgsError::InvalidCode { raw: value.clone() })?;
                    code = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { exam_id, code })
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: take a real test when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Take => {
            let gateway = HttpGateway::from_env()
                .ok_or("EXAM_API_URL is not set; configure the backend or run the demo")?;
            start_and_run(Arc::new(gateway), parsed).await
        }
        Command::Demo => {
            let gateway = seed_demo()?;
            println!("demo test ready; the access code is {DEMO_CODE}");
            let parsed = Args {
                exam_id: ExamId::new(DEMO_EXAM_ID),
                code: parsed.code,
            };
            start_and_run(gateway, parsed).await
        }
    }
}

async fn start_and_run(
    gateway: Arc<dyn ExamGateway>,
    args: Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut flow = AttemptFlow::new(Clock::default_clock(), gateway);
    match &args.code {
        Some(code) => flow.start_by_code(code.as_str()).await?,
        None => flow.start(args.exam_id).await?,
    };
    runner::run(flow).await
}

const DEMO_EXAM_ID: u64 = 1;
const DEMO_CODE: &str = "524190";

/// Seed the built-in practice test. Lives in the binary glue so the gateway
/// crate stays free of demo content.
fn seed_demo() -> Result<Arc<InMemoryGateway>, Box<dyn std::error::Error>> {
    let exam_id = ExamId::new(DEMO_EXAM_ID);
    let arithmetic = SectionId::new(1);
    let free_response = SectionId::new(2);

    let exam = Exam::new(
        exam_id,
        "Practice Placement Test",
        Some("A short built-in test; answers are scored locally.".into()),
        Difficulty::Easy,
        4,
        3,
        vec![
            Section::new(arithmetic, "Arithmetic", 0, 120, 3)?,
            Section::new(free_response, "Free Response", 1, 90, 1)?,
        ],
    )?;

    let gateway = InMemoryGateway::new().with_clock(Clock::default_clock());
    gateway.insert_exam(exam)?;
    gateway.insert_section_questions(
        exam_id,
        arithmetic,
        vec![
            demo_question(1, "What is 7 x 8?", 0, ["54", "56", "63", "64"])?,
            demo_question(2, "Which of these numbers is prime?", 1, ["21", "27", "29", "33"])?,
            demo_question(3, "What is 144 / 12?", 2, ["10", "11", "12", "14"])?,
        ],
    )?;
    gateway.insert_section_questions(
        exam_id,
        free_response,
        vec![Question::new(
            QuestionId::new(4),
            "In a sentence or two, how do you check an answer before moving on?",
            None,
            1,
            0,
            QuestionKind::ShortAnswer,
            Vec::new(),
        )?],
    )?;
    gateway.set_correct_choice(exam_id, QuestionId::new(1), ChoiceId::new(12))?;
    gateway.set_correct_choice(exam_id, QuestionId::new(2), ChoiceId::new(23))?;
    gateway.set_correct_choice(exam_id, QuestionId::new(3), ChoiceId::new(33))?;
    gateway.set_test_code(exam_id, TestCode::new(DEMO_CODE)?)?;

    Ok(Arc::new(gateway))
}

fn demo_question(
    id: u64,
    prompt: &str,
    order: u32,
    texts: [&str; 4],
) -> Result<Question, Box<dyn std::error::Error>> {
    let labels = [ChoiceLabel::A, ChoiceLabel::B, ChoiceLabel::C, ChoiceLabel::D];
    let mut choices = Vec::with_capacity(texts.len());
    for (slot, (label, text)) in labels.into_iter().zip(texts).enumerate() {
        let choice_id = ChoiceId::new(id * 10 + slot as u64 + 1);
        choices.push(Choice::new(choice_id, label, text)?);
    }
    Ok(Question::new(
        QuestionId::new(id),
        prompt,
        None,
        1,
        order,
        QuestionKind::MultipleChoice,
        choices,
    )?)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(EnvFilter::from_default_env())
        .init();
    tracing::info!("exam console starting");

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
