//! Interactive question-answering loop.
//!
//! One question per line, no conversation memory. The loop ends on an exit
//! keyword or end-of-input; an error during a turn is reported to the user
//! and the loop continues.

use crate::pipeline::QueryPipeline;
use std::io::{BufRead, Write};

const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "sair"];

/// Greeting printed before the first prompt.
pub const GREETING: &str =
    "Olá, sou seu assistente financeiro, faça sua pergunta! (digite 'sair' para encerrar)";
/// Farewell printed when the user leaves.
pub const FAREWELL: &str = "Foi um prazer te ajudar. Até logo!";

/// Run the read-answer loop until an exit keyword or end-of-input.
pub async fn run<R, W>(
    pipeline: &QueryPipeline<'_>,
    mut input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{GREETING}")?;
    writeln!(output)?;

    let mut line = String::new();
    loop {
        write!(output, "Você: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            // End-of-input behaves like an explicit exit.
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if is_exit_keyword(question) {
            break;
        }

        match pipeline.answer(question).await {
            Ok(answer) => writeln!(output, "Assistente: {answer}\n")?,
            Err(error) => {
                tracing::error!(error = %error, "Turn failed");
                writeln!(
                    output,
                    "Assistente: não consegui responder agora ({error}). Tente novamente.\n"
                )?;
            }
        }
    }

    writeln!(output, "{FAREWELL}")?;
    Ok(())
}

fn is_exit_keyword(input: &str) -> bool {
    EXIT_KEYWORDS
        .iter()
        .any(|keyword| input.eq_ignore_ascii_case(keyword))
}
