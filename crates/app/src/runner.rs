//! Interactive terminal loop that drives an attempt to completion.

use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use exam_core::model::{AnswerValue, AttemptResult, ChoiceLabel};
use services::{
    AttemptFlow, FlowPhase, SubmitOutcome, TickOutcome, format_timer, palette, palette_label,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

/// Run the attempt loop until the test completes or the user quits.
///
/// A one-second ticker keeps the countdown honest even while the user idles;
/// commands arrive line by line on stdin.
///
/// # Errors
///
/// Returns an error only when reading stdin fails.
pub async fn run(mut flow: AttemptFlow) -> Result<(), Box<dyn Error>> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirm = false;

    greet(&flow);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if step_clock(&mut flow).await {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("input closed; the attempt stays resumable on the server");
                    break;
                };
                if dispatch(&mut flow, line.trim(), &mut confirm).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

//
// ─── CLOCK ─────────────────────────────────────────────────────────────────────
//

/// Returns true when the loop should end.
async fn step_clock(flow: &mut AttemptFlow) -> bool {
    match flow.tick().await {
        TickOutcome::Inactive => false,
        TickOutcome::Running { remaining_secs } => {
            if remaining_secs > 0 && (remaining_secs % 60 == 0 || remaining_secs <= 10) {
                println!("{} left", format_timer(remaining_secs));
            }
            false
        }
        TickOutcome::SectionEnded(outcome) => {
            println!("time is up; the section was submitted automatically");
            announce(flow, &outcome).await
        }
        TickOutcome::SubmitPending(err) => {
            println!("time is up, but the submission failed: {err}");
            println!("it will be retried automatically");
            false
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

/// Returns true when the loop should end. `confirm` survives exactly one
/// round trip: a submit with unanswered questions sets it, the immediate
/// next `s` honors it, and any other command clears it.
async fn dispatch(flow: &mut AttemptFlow, line: &str, confirm: &mut bool) -> bool {
    let confirmed = std::mem::take(confirm);
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };

    match command {
        "" => {
            if flow.phase() == FlowPhase::Ready {
                open_section(flow).await;
            }
            false
        }
        "h" | "?" | "help" => {
            print_help();
            false
        }
        "q" | "quit" => {
            println!("leaving; the attempt stays resumable on the server");
            true
        }
        "a" | "b" | "c" | "d" => {
            choose(flow, command);
            false
        }
        "t" => {
            record(flow, AnswerValue::Text(rest.to_owned()));
            false
        }
        "n" => {
            match flow.next_question() {
                Ok(_) => render_question(flow),
                Err(err) => println!("{err}"),
            }
            false
        }
        "p" => {
            match flow.previous_question() {
                Ok(_) => render_question(flow),
                Err(err) => println!("{err}"),
            }
            false
        }
        "g" => {
            goto(flow, rest);
            false
        }
        "m" => {
            match flow.toggle_mark() {
                Ok(true) => println!("marked for review"),
                Ok(false) => println!("mark cleared"),
                Err(err) => println!("{err}"),
            }
            false
        }
        "o" => {
            overview(flow);
            false
        }
        "time" => {
            match flow.remaining_secs() {
                Some(remaining) => println!("{} left", format_timer(remaining)),
                None => println!("no section is running"),
            }
            false
        }
        "r" => {
            open_section(flow).await;
            false
        }
        "s" | "submit" => {
            let unanswered = flow.progress().map_or(0, |progress| progress.unanswered);
            if unanswered > 0 && !confirmed {
                *confirm = true;
                println!("{unanswered} unanswered; press s again to submit anyway");
                false
            } else {
                submit(flow).await
            }
        }
        _ => {
            println!("unknown command: {command} (h lists the commands)");
            false
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  a b c d     answer the current question with that choice");
    println!("  t <answer>  answer with free text (t alone clears the answer)");
    println!("  n / p       next / previous question");
    println!("  g <number>  jump to a question");
    println!("  m           mark or unmark the current question for review");
    println!("  o           overview of the section palette");
    println!("  time        show the remaining time");
    println!("  s           submit the section (the last section submits the test)");
    println!("  r / enter   open the next section from the rest screen");
    println!("  q           quit; progress stays on the server");
}

fn choose(flow: &mut AttemptFlow, letter: &str) {
    let Ok(label) = ChoiceLabel::from_str(letter) else {
        return;
    };
    let choice_id = flow
        .session()
        .and_then(|session| session.current_question())
        .and_then(|question| {
            question
                .choices()
                .iter()
                .find(|choice| choice.label() == label)
                .map(|choice| choice.id())
        });
    match choice_id {
        Some(id) => record(flow, AnswerValue::Choice(id)),
        None => println!("no choice {label} on this question"),
    }
}

fn record(flow: &mut AttemptFlow, value: AnswerValue) {
    let blank = value.is_blank();
    match flow.answer_current(value) {
        Ok(_) if blank => println!("answer cleared"),
        Ok(_) => println!("saved"),
        Err(err) => println!("{err}"),
    }
}

fn goto(flow: &mut AttemptFlow, rest: &str) {
    let Ok(number) = rest.parse::<usize>() else {
        println!("g takes a question number, e.g. g 3");
        return;
    };
    if number == 0 {
        println!("questions are numbered from 1");
        return;
    }
    match flow.go_to(number - 1) {
        Ok(_) => render_question(flow),
        Err(err) => println!("{err}"),
    }
}

async fn open_section(flow: &mut AttemptFlow) {
    match flow.start_section().await {
        Ok(_) => render_section(flow),
        Err(err) => {
            println!("could not open the section: {err}");
            if err.is_retriable() {
                println!("try again in a moment");
            }
        }
    }
}

async fn submit(flow: &mut AttemptFlow) -> bool {
    match flow.submit().await {
        Ok(SubmitOutcome::Ignored) => {
            println!("nothing to submit right now");
            false
        }
        Ok(outcome) => announce(flow, &outcome).await,
        Err(err) => {
            println!("submit failed: {err}");
            if err.is_retriable() {
                println!("your answers are kept; submit again in a moment");
            }
            false
        }
    }
}

/// Print what a submission outcome means for the user. Returns true when the
/// attempt is over and the loop should end.
async fn announce(flow: &mut AttemptFlow, outcome: &SubmitOutcome) -> bool {
    match outcome {
        SubmitOutcome::NextSection(_) => {
            if flow.phase() == FlowPhase::InProgress {
                println!("section complete");
                render_section(flow);
            } else {
                println!("section complete, but the next one did not open");
                println!("press enter to retry");
            }
            false
        }
        SubmitOutcome::Completed(result) => {
            // the completion call only acknowledges the totals
            match flow.fetch_result().await {
                Ok(full) => render_result(full),
                Err(err) => {
                    println!("could not fetch the section breakdown: {err}");
                    render_result(result);
                }
            }
            true
        }
        SubmitOutcome::Ignored => false,
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn greet(flow: &AttemptFlow) {
    if let Some(exam) = flow.exam() {
        println!();
        println!("{}", exam.title());
        if let Some(description) = exam.description() {
            println!("{description}");
        }
        println!(
            "{} sections, {} marks total, {} to pass",
            exam.section_count(),
            exam.total_marks(),
            exam.passing_marks()
        );
    }
    println!("type h for the command list");
    render_rest(flow);
}

fn render_rest(flow: &AttemptFlow) {
    let Some(next) = flow.next_section() else {
        return;
    };
    if let Some(section) = flow.exam().and_then(|exam| exam.section(next)) {
        println!(
            "next up: {} ({} questions, {} on the clock)",
            section.name(),
            section.question_count(),
            format_timer(section.time_limit_secs())
        );
    } else {
        println!("the next section is ready");
    }
    println!("press enter to begin");
}

fn render_section(flow: &AttemptFlow) {
    let Some(session) = flow.session() else {
        return;
    };
    println!();
    println!("=== {} ===", session.section_name());
    println!(
        "{} questions, {} on the clock",
        session.question_count(),
        format_timer(session.time_limit_secs())
    );
    render_question(flow);
}

fn render_question(flow: &AttemptFlow) {
    let Some(session) = flow.session() else {
        return;
    };
    let Some(question) = session.current_question() else {
        println!("this section has no questions; submit when ready");
        return;
    };

    println!();
    println!(
        "Q{} of {} ({} mark{})",
        session.current_index() + 1,
        session.question_count(),
        question.marks(),
        if question.marks() == 1 { "" } else { "s" }
    );
    if let Some(passage) = question.passage() {
        println!("{passage}");
        println!();
    }
    println!("{}", question.prompt());
    for choice in question.choices() {
        println!("  {}) {}", choice.label(), choice.text());
    }
    if !question.kind().is_selectable() {
        println!("  answer with: t <your answer>");
    }

    let marked = if session.is_marked(question.id()) {
        ", marked"
    } else {
        ""
    };
    match session.answer(question.id()) {
        Some(AnswerValue::Choice(id)) => {
            let label = question
                .choice(*id)
                .map(|choice| choice.label().to_string())
                .unwrap_or_else(|| id.to_string());
            println!("[answered: {label}{marked}]");
        }
        Some(AnswerValue::Text(text)) => println!("[answered: {text}{marked}]"),
        None => println!("[unanswered{marked}]"),
    }
}

fn overview(flow: &AttemptFlow) {
    let Some(session) = flow.session() else {
        println!("no section is open");
        return;
    };
    let labels: Vec<String> = palette(session).iter().map(palette_label).collect();
    println!("{}", labels.join(" "));
    if let Some(progress) = flow.progress() {
        println!(
            "{} of {} answered, {} marked",
            progress.answered, progress.total, progress.marked
        );
    }
}

fn render_result(result: &AttemptResult) {
    println!();
    println!("=== Results ===");
    println!(
        "score {}/{} ({:.0}%), {}",
        result.score(),
        result.total_marks(),
        result.percentage(),
        if result.passed() { "passed" } else { "not passed" }
    );
    for section in result.section_results() {
        println!(
            "  {}: {}/{} in {}",
            section.section_name(),
            section.score(),
            section.total_marks(),
            format_timer(section.time_taken_secs())
        );
    }
    println!("total time {}", format_timer(result.time_taken_secs()));
}
