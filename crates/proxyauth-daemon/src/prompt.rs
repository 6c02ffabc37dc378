//! Terminal credential prompt.
//!
//! Asks on the daemon's controlling terminal: the form goes to stderr and the
//! answers are read from stdin, with echo turned off for the password.
//!
//! Every prompt reads through one long-lived line reader. A prompt that is
//! abandoned mid-read (timed out, or the daemon is shutting down) leaves the
//! reader intact, so the next line the user types goes to the form that is
//! on screen.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use async_trait::async_trait;
use nix::sys::termios::{LocalFlags, SetArg, Termios, tcgetattr, tcsetattr};
use proxyauth::{Credentials, PromptError, PromptGateway, PromptOutcome, PromptRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Answer that cancels the prompt when a username is prefilled.
const CANCEL: &str = "-";

/// Hides typed input until dropped.
type ConcealFn<G> = fn() -> io::Result<G>;

/// Input and output of the form, locked together for one prompt.
struct Terminal<R, W> {
    lines: Lines<R>,
    output: W,
}

/// [`PromptGateway`] that asks on the terminal.
pub struct TerminalPrompt<R = BufReader<Stdin>, W = io::Stderr, G = Option<EchoOff>> {
    terminal: Arc<Mutex<Terminal<R, W>>>,
    conceal: ConcealFn<G>,
}

impl TerminalPrompt {
    /// Creates a prompt on the process's stdin and stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terminal: Arc::new(Mutex::new(Terminal {
                lines: BufReader::new(tokio::io::stdin()).lines(),
                output: io::stderr(),
            })),
            conceal: EchoOff::stdin,
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> TerminalPrompt<R, W, ()>
where
    R: AsyncBufRead + Unpin,
{
    /// Creates a prompt over arbitrary input and output. Input is never
    /// concealed.
    pub fn with_terminal(input: R, output: W) -> Self {
        Self {
            terminal: Arc::new(Mutex::new(Terminal {
                lines: input.lines(),
                output,
            })),
            conceal: || Ok(()),
        }
    }
}

#[async_trait]
impl<R, W, G> PromptGateway for TerminalPrompt<R, W, G>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
    G: Send,
{
    async fn prompt(&self, request: PromptRequest) -> Result<PromptOutcome, PromptError> {
        debug!(fingerprint = %request.fingerprint, "Prompting on terminal");

        let mut terminal = self.terminal.lock().await;
        let Terminal { lines, output } = &mut *terminal;
        ask(&request, lines, output, self.conceal).await
    }
}

/// Runs one credential form.
///
/// End of input or an empty username with nothing prefilled is a
/// cancellation; `-` cancels when a username is prefilled.
async fn ask<R, W, G>(
    request: &PromptRequest,
    input: &mut Lines<R>,
    output: &mut W,
    conceal: ConcealFn<G>,
) -> Result<PromptOutcome, PromptError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let challenge = &request.challenge;
    writeln!(output)?;
    if challenge.is_retry() {
        writeln!(
            output,
            "Proxy {}://{}:{} rejected the credentials. Try again.",
            challenge.scheme, challenge.host, challenge.port
        )?;
    } else {
        writeln!(
            output,
            "Proxy {}://{}:{} requires authentication.",
            challenge.scheme, challenge.host, challenge.port
        )?;
    }

    let prefill = request.prefill_username();
    if prefill.is_empty() {
        write!(output, "Username (empty to cancel): ")?;
    } else {
        write!(output, "Username [{prefill}] ('{CANCEL}' to cancel): ")?;
    }
    output.flush()?;

    let Some(entered) = input.next_line().await? else {
        return Ok(PromptOutcome::Cancelled);
    };
    let Some(username) = choose_username(entered.trim(), prefill) else {
        return Ok(PromptOutcome::Cancelled);
    };

    write!(output, "Password: ")?;
    output.flush()?;
    let password = {
        let _hidden = conceal()?;
        input.next_line().await?
    };
    let Some(password) = password else {
        return Ok(PromptOutcome::Cancelled);
    };

    write!(output, "Remember for future sessions? [y/N]: ")?;
    output.flush()?;
    let remember = input
        .next_line()
        .await?
        .is_some_and(|answer| is_yes(answer.trim()));

    Ok(PromptOutcome::Submitted {
        credentials: Credentials::new(username, password),
        remember,
    })
}

fn choose_username(entered: &str, prefill: &str) -> Option<String> {
    match (entered, prefill) {
        (CANCEL, _) | ("", "") => None,
        ("", prefill) => Some(prefill.to_string()),
        (entered, _) => Some(entered.to_string()),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Turns terminal echo off on stdin and restores it on drop.
pub struct EchoOff {
    saved: Termios,
}

impl EchoOff {
    /// Disables echo if stdin is a terminal; `None` otherwise.
    fn stdin() -> io::Result<Option<Self>> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Ok(None);
        }

        let saved = tcgetattr(&stdin)?;
        let mut hidden = saved.clone();
        hidden.local_flags.remove(LocalFlags::ECHO);
        hidden.local_flags.insert(LocalFlags::ECHONL);
        tcsetattr(&stdin, SetArg::TCSANOW, &hidden)?;

        Ok(Some(Self { saved }))
    }
}

impl Drop for EchoOff {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(io::stdin(), SetArg::TCSANOW, &self.saved) {
            debug!(error = %e, "Failed to restore terminal echo");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::time::Duration;

    use proxyauth::{Attempt, AuthChallenge, TimedGateway};
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn request(host: &str, prefill: Option<Credentials>, attempt: Attempt) -> PromptRequest {
        let challenge = AuthChallenge::builder()
            .host(host)
            .port(3128)
            .attempt(attempt)
            .build();
        PromptRequest::new(challenge, prefill)
    }

    async fn run(request: &PromptRequest, input: &str) -> (Result<PromptOutcome, PromptError>, String) {
        let mut lines = BufReader::new(input.as_bytes()).lines();
        let mut output = Vec::new();
        let outcome = ask(request, &mut lines, &mut output, || Ok(())).await;
        (outcome, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_submit_and_remember() {
        let (outcome, shown) = run(&request("proxy.corp", None, Attempt::First), "alice\nhunter2\nyes\n").await;

        assert_eq!(
            outcome.unwrap(),
            PromptOutcome::Submitted {
                credentials: Credentials::new("alice", "hunter2"),
                remember: true,
            }
        );
        assert!(shown.contains("http://proxy.corp:3128 requires authentication"));
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_password_keeps_surrounding_spaces() {
        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "alice\n pass word \r\n\n").await;

        assert_eq!(
            outcome.unwrap(),
            PromptOutcome::Submitted {
                credentials: Credentials::new("alice", " pass word "),
                remember: false,
            }
        );
    }

    #[tokio::test]
    async fn test_remember_defaults_to_no() {
        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "alice\nhunter2\n\n").await;
        assert!(matches!(
            outcome.unwrap(),
            PromptOutcome::Submitted { remember: false, .. }
        ));

        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "alice\nhunter2\n").await;
        assert!(matches!(
            outcome.unwrap(),
            PromptOutcome::Submitted { remember: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_username_cancels() {
        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "\n").await;
        assert_eq!(outcome.unwrap(), PromptOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_end_of_input_cancels() {
        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "").await;
        assert_eq!(outcome.unwrap(), PromptOutcome::Cancelled);

        let (outcome, _) = run(&request("proxy.corp", None, Attempt::First), "alice\n").await;
        assert_eq!(outcome.unwrap(), PromptOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_retry_keeps_prefilled_username() {
        let prefill = Some(Credentials::new("alice", "wrong"));
        let (outcome, shown) = run(&request("proxy.corp", prefill, Attempt::Retry), "\nhunter2\nn\n").await;

        assert_eq!(
            outcome.unwrap(),
            PromptOutcome::Submitted {
                credentials: Credentials::new("alice", "hunter2"),
                remember: false,
            }
        );
        assert!(shown.contains("rejected the credentials"));
        assert!(shown.contains("Username [alice]"));
        assert!(!shown.contains("wrong"));
    }

    #[tokio::test]
    async fn test_dash_cancels_with_prefill() {
        let prefill = Some(Credentials::new("alice", "wrong"));
        let (outcome, _) = run(&request("proxy.corp", prefill, Attempt::Retry), "-\n").await;
        assert_eq!(outcome.unwrap(), PromptOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_conceal_failure_is_gateway_error() {
        let mut lines = BufReader::new(b"alice\nhunter2\n".as_slice()).lines();
        let mut output = Vec::new();
        let outcome = ask(
            &request("proxy.corp", None, Attempt::First),
            &mut lines,
            &mut output,
            || Err::<(), _>(io::Error::new(io::ErrorKind::NotFound, "no tty")),
        )
        .await;
        assert!(matches!(outcome, Err(PromptError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_prompt_releases_the_terminal() {
        let (input, mut keyboard) = tokio::io::duplex(64);
        let prompt = Arc::new(TerminalPrompt::with_terminal(BufReader::new(input), Vec::new()));
        let timed = TimedGateway::new(Arc::clone(&prompt), Duration::from_secs(30));

        // Nobody answers the first form.
        let first = timed.prompt(request("a.corp", None, Attempt::First)).await;
        assert!(matches!(first, Err(PromptError::TimedOut(_))));

        // The next form gets everything typed after it appears.
        let second = tokio::spawn({
            let prompt = Arc::clone(&prompt);
            async move { prompt.prompt(request("b.corp", None, Attempt::First)).await }
        });
        keyboard.write_all(b"bob\nhunter2\ny\n").await.unwrap();

        assert_eq!(
            second.await.unwrap().unwrap(),
            PromptOutcome::Submitted {
                credentials: Credentials::new("bob", "hunter2"),
                remember: true,
            }
        );

        let terminal = prompt.terminal.lock().await;
        let shown = String::from_utf8(terminal.output.clone()).unwrap();
        assert!(shown.contains("a.corp:3128"));
        assert!(shown.contains("b.corp:3128"));
    }

    #[test]
    fn test_choose_username() {
        assert_eq!(choose_username("bob", "alice"), Some("bob".to_string()));
        assert_eq!(choose_username("", "alice"), Some("alice".to_string()));
        assert_eq!(choose_username("", ""), None);
        assert_eq!(choose_username("-", "alice"), None);
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes("YES"));
        assert!(!is_yes("no"));
        assert!(!is_yes(""));
    }
}
