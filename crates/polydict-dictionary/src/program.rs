use std::process::Stdio;

use async_trait::async_trait;
use polydict_config::dictionary::{ProgramConfig, ProgramKind};
use polydict_core::{
    ArticleOptions, ArticleReply, DictError, Dictionary, DictionaryInfo, WordMatch, WordMatches,
    WordPattern,
};
use polydict_types::MatchKind;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const WORD_PLACEHOLDER: &str = "%GDWORD%";

/// Dictionary backed by an external command.
///
/// The child is killed when the request is dropped, so cancelling a lookup
/// never leaves the process behind.
pub struct ProgramDictionary {
    info: DictionaryInfo,
    command_line: String,
    kind: ProgramKind,
}

impl ProgramDictionary {
    pub fn new(config: &ProgramConfig) -> Self {
        let mut info = DictionaryInfo::new(config.id.as_str(), config.name.as_str());
        info.icon = config.icon.clone();

        Self {
            info,
            command_line: config.command_line.clone(),
            kind: config.kind,
        }
    }

    async fn run(&self, word: &str) -> Result<Vec<u8>, DictError> {
        let mut args = parse_command_line(&self.command_line);
        if args.is_empty() {
            return Err(DictError::BackendUnavailable(
                "No program name was given.".into(),
            ));
        }
        let program = args.remove(0);

        let mut to_stdin = true;
        for arg in &mut args {
            if arg.contains(WORD_PLACEHOLDER) {
                to_stdin = false;
                *arg = arg.replace(WORD_PLACEHOLDER, word);
            }
        }

        tracing::debug!("{}: running {program} {args:?}", self.info.id);
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(if to_stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DictError::BackendUnavailable(format!("cannot start {program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The program may exit without reading its input
            if let Err(e) = stdin.write_all(word.as_bytes()).await {
                tracing::debug!("{}: stdin closed early: {e}", self.info.id);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DictError::BackendCrashed(e.to_string()))?;

        let mut error = match output.status.code() {
            Some(0) => return Ok(output.stdout),
            Some(code) => format!("The program has returned exit code {code}."),
            None => "The program has crashed.".to_string(),
        };
        let stderr = decode_output(&output.stderr);
        if !stderr.trim().is_empty() {
            error.push_str("\n\n");
            error.push_str(stderr.trim_end());
        }
        Err(DictError::BackendCrashed(error))
    }
}

#[async_trait]
impl Dictionary for ProgramDictionary {
    fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    async fn match_word(
        &self,
        pattern: &WordPattern,
        max_results: usize,
    ) -> Result<WordMatches, DictError> {
        // Only a prefix-match program can list headwords
        if self.kind != ProgramKind::PrefixMatch {
            return Ok(WordMatches::uncertain());
        }

        let output = decode_output(&self.run(pattern.text()).await?);
        let matches = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| WordMatch::new(line, pattern.classify(line).unwrap_or(MatchKind::Fuzzy)))
            .take(max_results)
            .collect();

        Ok(WordMatches::new(matches))
    }

    async fn fetch_article(
        &self,
        headword: &str,
        _options: &ArticleOptions,
    ) -> Result<ArticleReply, DictError> {
        if self.kind == ProgramKind::PrefixMatch {
            return Ok(ArticleReply::empty());
        }

        let output = self.run(headword).await?;
        if output.is_empty() {
            return Ok(ArticleReply::empty());
        }

        let text = decode_output(&output);
        let body = match self.kind {
            ProgramKind::Html => format!("<div class='programs_html'>{text}</div>"),
            _ => format!(
                "<div class='programs_plaintext'><pre>{}</pre></div>",
                html_escape(&text)
            ),
        };
        Ok(ArticleReply::with_body(body))
    }
}

/// Splits a command line into arguments, honouring single and double quotes
pub fn parse_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut pending = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') if matches!(chars.peek(), Some('"') | Some('\\')) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                pending = true;
            }
            (None, c) if c.is_whitespace() => {
                if pending || !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            (None, c) => current.push(c),
        }
    }

    if pending || !current.is_empty() {
        args.push(current);
    }
    args
}

/// Decodes program output, detecting UTF-16 and UTF-8 byte order marks
pub fn decode_output(bytes: &[u8]) -> String {
    let utf16 = |data: &[u8], from: fn([u8; 2]) -> u16| -> String {
        let units = data.chunks_exact(2).map(|pair| from([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };

    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use polydict_types::MatchMode;

    fn program(command_line: &str, kind: ProgramKind) -> ProgramDictionary {
        ProgramDictionary::new(&ProgramConfig {
            id: "prg".into(),
            name: "Program".into(),
            command_line: command_line.into(),
            kind,
            enabled: true,
            icon: None,
        })
    }

    #[test]
    fn command_line_quotes_group_arguments() {
        assert_eq!(
            parse_command_line(r#"dict -d "big \"one\"" 'a b'  %GDWORD%"#),
            vec!["dict", "-d", r#"big "one""#, "a b", "%GDWORD%"]
        );
        assert_eq!(parse_command_line(r#"run """#), vec!["run", ""]);
        assert!(parse_command_line("   ").is_empty());
    }

    #[test]
    fn output_decoding_follows_bom() {
        assert_eq!(decode_output(b"\xEF\xBB\xBFcaf\xC3\xA9"), "café");
        assert_eq!(decode_output(&[0xFF, 0xFE, b'h', 0, b'i', 0]), "hi");
        assert_eq!(decode_output(&[0xFE, 0xFF, 0, b'h', 0, b'i']), "hi");
        assert_eq!(decode_output(b"plain"), "plain");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn placeholder_passes_word_as_argument() {
        let dictionary = program("echo <%GDWORD%>", ProgramKind::PlainText);
        let reply = dictionary
            .fetch_article("hello", &ArticleOptions::default())
            .await
            .unwrap();

        let body = reply.body.unwrap();
        assert!(body.starts_with("<div class='programs_plaintext'><pre>"));
        assert!(body.contains("&lt;hello&gt;"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn word_goes_to_stdin_without_placeholder() {
        let dictionary = program("cat", ProgramKind::Html);
        let reply = dictionary
            .fetch_article("<i>word</i>", &ArticleOptions::default())
            .await
            .unwrap();
        assert_eq!(
            reply.body.as_deref(),
            Some("<div class='programs_html'><i>word</i></div>")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prefix_match_lines_become_suggestions() {
        let dictionary = program(
            "sh -c \"echo test; echo testing; echo contest\"",
            ProgramKind::PrefixMatch,
        );
        let pattern = WordPattern::new("test", MatchMode::Literal).unwrap();
        let found = dictionary.match_word(&pattern, 10).await.unwrap();

        let kinds: Vec<_> = found
            .matches
            .iter()
            .map(|m| (m.headword.as_str(), m.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("test", MatchKind::Exact),
                ("testing", MatchKind::Prefix),
                ("contest", MatchKind::Fuzzy),
            ]
        );
        assert!(!found.uncertain);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_crash_with_stderr() {
        let dictionary = program("sh -c \"echo broken >&2; exit 3\"", ProgramKind::PlainText);
        match dictionary.fetch_article("x", &ArticleOptions::default()).await {
            Err(DictError::BackendCrashed(message)) => {
                assert!(message.contains("exit code 3"));
                assert!(message.contains("broken"));
            }
            other => panic!("Expected a crash, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_kinds_only_offer_uncertain_suggestions() {
        let dictionary = program("true", ProgramKind::PlainText);
        let found = dictionary
            .match_word(&WordPattern::literal("word"), 10)
            .await
            .unwrap();
        assert!(found.uncertain);
        assert!(found.matches.is_empty());
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let dictionary = program("/nonexistent/polydict-helper %GDWORD%", ProgramKind::Html);
        let result = dictionary.fetch_article("x", &ArticleOptions::default()).await;
        assert!(matches!(result, Err(DictError::BackendUnavailable(_))));
    }
}
