//! Instruction strings sent to the model.
//!
//! Every builder here is pure: the same request always renders the same
//! prompt, with key points and previous chapters kept in input order.

use crate::models::{
    CreativeSuggestionsRequest, GenerateChapterRequest, PreviousChapter, SuggestionKind,
    SummarizeChapterRequest,
};

/// Previous-chapter text up to this many characters is embedded whole.
pub const FULL_TEXT_LIMIT: usize = 2000;
/// Characters kept from the start of a long previous chapter.
pub const HEAD_CHARS: usize = 800;
/// Characters kept from the end of a long previous chapter.
pub const TAIL_CHARS: usize = 1500;

pub const FIRST_CHAPTER_HEADER: &str = "## ABERTURA DO LIVRO";
pub const PREVIOUS_CHAPTERS_HEADER: &str = "## CAPÍTULOS ANTERIORES";
pub const CONTINUATION_ANCHOR: &str = "PONTO DE PARTIDA PARA A CONTINUAÇÃO";

pub const SUGGESTION_MARKER: &str = "[SUGESTÃO";
pub const TEXT_PREFIX: &str = "Texto:";
pub const DESCRIPTION_PREFIX: &str = "Descrição:";

/// Sections the summarizer asks the model to emit, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummarySection {
    Summary,
    Characters,
    Settings,
    KeyEvents,
    EndingState,
}

impl SummarySection {
    pub const ALL: [SummarySection; 5] = [
        SummarySection::Summary,
        SummarySection::Characters,
        SummarySection::Settings,
        SummarySection::KeyEvents,
        SummarySection::EndingState,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            SummarySection::Summary => "[RESUMO]",
            SummarySection::Characters => "[PERSONAGENS]",
            SummarySection::Settings => "[AMBIENTAÇÕES]",
            SummarySection::KeyEvents => "[EVENTOS-CHAVE]",
            SummarySection::EndingState => "[ESTADO FINAL]",
        }
    }

    fn format_instruction(&self) -> &'static str {
        match self {
            SummarySection::Summary => {
                "Dois a quatro parágrafos narrativos. Descreva como o capítulo começa, o que acontece e como termina."
            }
            SummarySection::Characters => {
                "Uma linha por personagem, começando com \"- \": nome, papel no capítulo e estado emocional ao final."
            }
            SummarySection::Settings => {
                "Uma linha por local, começando com \"- \": nome do local e o que nele acontece."
            }
            SummarySection::KeyEvents => {
                "Lista numerada (\"1.\", \"2.\", ...) dos acontecimentos importantes, em ordem cronológica."
            }
            SummarySection::EndingState => {
                "Um ou dois parágrafos narrativos: onde estão os personagens, como se sentem e qual tensão permanece em aberto."
            }
        }
    }
}

pub fn build_chapter_prompt(request: &GenerateChapterRequest) -> String {
    let (opening, guidance) = if request.is_first_chapter() {
        (
            "Você é um escritor profissional e vai escrever o capítulo de abertura de um livro.",
            first_chapter_instructions(request),
        )
    } else {
        (
            "Você é um escritor profissional e vai escrever a continuação direta de um livro em andamento.",
            format!(
                "{}{}",
                previous_chapters_section(&request.previous_chapters),
                continuation_instructions(&request.previous_chapters)
            ),
        )
    };

    format!(
        "{opening}\n\n\
         ## PROJETO\n\
         - Título do livro: {project}\n\
         - Idioma: {language}\n\n\
         ## CAPÍTULO A SER ESCRITO\n\
         - Título: {title}\n\
         - Resumo: {summary}\n\n\
         {guidance}\
         {key_points}\
         ## PARÂMETROS DE ESCRITA\n\
         - Tom: {tone}\n\
         - Estilo: {style}\n\
         - Ambientação: {setting}\n\
         - Extensão: aproximadamente {pages} páginas (cerca de {words} palavras)\n\n\
         Escreva APENAS o texto narrativo do capítulo, em {language}. Não inclua título, numeração, prefácio, notas ou comentários.",
        project = request.project_title,
        language = request.language,
        title = request.chapter_title,
        summary = request.chapter_summary,
        key_points = key_points_section(&request.key_points),
        tone = request.tone,
        style = request.writing_style,
        setting = request.setting,
        pages = request.length_in_pages,
        words = request.target_word_count(),
    )
}

fn first_chapter_instructions(request: &GenerateChapterRequest) -> String {
    format!(
        "{FIRST_CHAPTER_HEADER}\n\
         Este é o primeiro capítulo do livro. Ao escrevê-lo:\n\
         1. Prenda o leitor já nas primeiras linhas com uma imagem, ação ou pergunta instigante.\n\
         2. Estabeleça a voz narrativa e o tom imediatamente.\n\
         3. Apresente os personagens por meio de suas ações, não de exposição.\n\
         4. Construa a ambientação aos poucos, entrelaçada com a ação.\n\
         5. Plante uma tensão ou conflito logo no início.\n\
         6. Escreva cerca de {} palavras.\n\
         7. Não escreva cabeçalho de capítulo nem comentários sobre o texto.\n\n",
        request.target_word_count()
    )
}

fn key_points_section(points: &[String]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let bullets: String = points.iter().map(|point| format!("- {}\n", point)).collect();
    format!("## PONTOS-CHAVE A INCLUIR\n{}\n", bullets)
}

fn previous_chapters_section(chapters: &[PreviousChapter]) -> String {
    let blocks: String = chapters
        .iter()
        .enumerate()
        .map(|(idx, chapter)| render_previous_chapter(idx + 1, chapter))
        .collect();
    format!("{}\n{}\n", PREVIOUS_CHAPTERS_HEADER, blocks)
}

fn embedded_text(chapter: &PreviousChapter) -> Option<&str> {
    chapter.generated_text.as_deref().filter(|t| !t.trim().is_empty())
}

/// True when the chapter's text is cut down and its ending carries the
/// continuation anchor.
fn is_truncated(chapter: &PreviousChapter) -> bool {
    embedded_text(chapter).is_some_and(|text| text.chars().count() > FULL_TEXT_LIMIT)
}

/// Renders one previous chapter. Long texts keep their opening and, weighted
/// more heavily, their ending, which the new chapter continues from.
pub fn render_previous_chapter(number: usize, chapter: &PreviousChapter) -> String {
    let header = format!(
        "\n### Capítulo {}: {}\nResumo: {}\n",
        number, chapter.title, chapter.summary
    );

    let Some(text) = embedded_text(chapter) else {
        return header;
    };

    if is_truncated(chapter) {
        format!(
            "{header}Início do capítulo:\n{}\n[...]\nFinal do capítulo ({CONTINUATION_ANCHOR}):\n{}\n",
            head_chars(text, HEAD_CHARS),
            tail_chars(text, TAIL_CHARS)
        )
    } else {
        format!("{header}Texto completo:\n{text}\n")
    }
}

fn continuation_instructions(chapters: &[PreviousChapter]) -> String {
    let bridge = if chapters.last().is_some_and(is_truncated) {
        format!("do trecho marcado como {} do último capítulo", CONTINUATION_ANCHOR)
    } else {
        "do final do último capítulo".to_string()
    };

    format!(
        "## INSTRUÇÕES DE CONTINUIDADE\n\
         1. Comece o novo capítulo como uma ponte narrativa direta a partir {bridge}.\n\
         2. Mantenha a consistência de personagens, locais e acontecimentos já estabelecidos.\n\
         3. Não reconte explicitamente o que aconteceu nos capítulos anteriores.\n\
         4. Preserve a voz narrativa e o ritmo dos capítulos anteriores.\n\n"
    )
}

fn head_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn tail_chars(text: &str, count: usize) -> &str {
    let total = text.chars().count();
    if total <= count {
        return text;
    }
    match text.char_indices().nth(total - count) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn suggestion_instruction(kind: SuggestionKind) -> (&'static str, &'static [&'static str]) {
    match kind {
        SuggestionKind::Title => (
            "títulos criativos e cativantes para a história",
            &[
                "Curtos e memoráveis, de uma a cinco palavras",
                "Evocam o tema central ou o conflito da história",
                "Despertam curiosidade sem revelar o desfecho",
            ],
        ),
        SuggestionKind::Character => (
            "personagens únicos e memoráveis, com nome e traço marcante",
            &[
                "Nomes coerentes com a cultura e a época da história",
                "Cada personagem com uma motivação ou conflito próprio",
                "Evite clichês e estereótipos",
            ],
        ),
        SuggestionKind::Plot => (
            "ideias de enredo interessantes e originais",
            &[
                "Cada ideia com um conflito claro e algo em jogo",
                "Reviravoltas plausíveis dentro do gênero",
                "Ganchos que sustentem vários capítulos",
            ],
        ),
        SuggestionKind::Setting => (
            "ambientações ricas e detalhadas",
            &[
                "Detalhes sensoriais: sons, cheiros, luz, clima",
                "Lugares que influenciem a ação e o humor da cena",
                "Uma característica singular que torne o lugar memorável",
            ],
        ),
    }
}

pub fn build_suggestions_prompt(request: &CreativeSuggestionsRequest) -> String {
    let (instruction, guidelines) = suggestion_instruction(request.kind);
    let guidelines: String = guidelines.iter().map(|g| format!("- {}\n", g)).collect();
    let mut examples: String = (1..=request.count.min(2))
        .map(|n| {
            format!(
                "{SUGGESTION_MARKER} {n}]\n\
                 {TEXT_PREFIX} [texto da sugestão]\n\
                 {DESCRIPTION_PREFIX} [uma ou duas frases explicativas]\n\n"
            )
        })
        .collect();
    if request.count > 2 {
        examples.push_str(&format!("... até {} {}]\n\n", SUGGESTION_MARKER, request.count));
    }

    format!(
        "Você é um consultor criativo especializado em escrita de ficção.\n\n\
         ## CONTEXTO\n{context}\n\n\
         ## PARÂMETROS\n\
         - Gênero: {genre}\n\
         - Tom: {tone}\n\n\
         ## TAREFA\nGere {count} {instruction}.\n\n\
         ## DIRETRIZES\n{guidelines}\n\
         ## FORMATO DE RESPOSTA (obrigatório)\n\
         Para cada sugestão, use exatamente este formato, sem texto antes ou depois:\n\n\
         {examples}\
         Seja criativo, original e coerente com o gênero {genre} e o tom {tone}.",
        context = request.context,
        genre = request.genre,
        tone = request.tone,
        count = request.count,
    )
}

pub fn build_summary_prompt(request: &SummarizeChapterRequest) -> String {
    let title = request
        .chapter_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("## TÍTULO DO CAPÍTULO\n{}\n\n", t))
        .unwrap_or_default();
    let sections: String = SummarySection::ALL
        .iter()
        .map(|section| format!("{}\n{}\n\n", section.marker(), section.format_instruction()))
        .collect();

    format!(
        "Você é um editor literário. Resuma o capítulo abaixo em {language}. O resumo será usado para escrever o próximo capítulo, então registre com precisão como o capítulo começa e, principalmente, como termina.\n\n\
         {title}\
         ## TEXTO DO CAPÍTULO\n{text}\n\n\
         ## FORMATO DE RESPOSTA (obrigatório)\n\
         Responda com as cinco seções abaixo, nesta ordem, cada uma iniciada pelo marcador exato:\n\n\
         {sections}\
         Não acrescente comentários fora das seções.",
        language = request.language,
        text = request.chapter_text.trim(),
    )
}
