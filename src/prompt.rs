//! Prompt template and context serialization for the query pipeline.

use crate::document::SearchHit;
use std::fmt::Write as _;

/// Fixed instruction template sent to the chat model.
///
/// `{contexto}` receives the serialized retrieval results and `{pergunta}`
/// the raw user question. The wording is a behavioral contract: the model is
/// told to answer only from the context and to emit the exact
/// [`REFUSAL_SENTENCE`] when the context is insufficient.
pub const PROMPT_TEMPLATE: &str = "
CONTEXTO:
{contexto}

REGRAS:
- Responda somente com base no CONTEXTO.
- Se a informação não estiver explicitamente no CONTEXTO, responda:
  \"Não tenho informações necessárias para responder sua pergunta.\"
- Nunca invente ou use conhecimento externo.
- Nunca produza opiniões ou interpretações além do que está escrito.

EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:
Pergunta: \"Qual é a capital da França?\"
Resposta: \"Não tenho informações necessárias para responder sua pergunta.\"

Pergunta: \"Quantos clientes temos em 2024?\"
Resposta: \"Não tenho informações necessárias para responder sua pergunta.\"

Pergunta: \"Você acha isso bom ou ruim?\"
Resposta: \"Não tenho informações necessárias para responder sua pergunta.\"

PERGUNTA DO USUÁRIO:
{pergunta}

RESPONDA A \"PERGUNTA DO USUÁRIO\"
";

/// Sentence the model must output when the context does not contain the answer.
pub const REFUSAL_SENTENCE: &str =
    "Não tenho informações necessárias para responder sua pergunta.";

/// Render retrieval results into the prompt's CONTEXTO block.
///
/// Each hit becomes an `[id] (score: s)` header followed by its text; hits
/// are separated by blank lines and arrive most relevant first.
pub fn format_context(hits: &[SearchHit]) -> String {
    let mut rendered = String::new();
    for (index, hit) in hits.iter().enumerate() {
        if index > 0 {
            rendered.push_str("\n\n");
        }
        let _ = write!(
            rendered,
            "[{}] (score: {:.2})\n{}",
            hit.id,
            hit.score,
            hit.text.trim()
        );
    }
    rendered
}

/// Substitute context and question into the instruction template.
pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{contexto}", context)
        .replace("{pergunta}", question)
}
