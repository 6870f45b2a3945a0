use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;

use snafu::{OptionExt, ResultExt, Snafu, ensure};

use notecraft::bus::{BusError, Post};
use notecraft::compose::{
    ComposeContext, ComposeError, ComposeRequest, ComposeResult, ComposeSession, Confirmation,
    NoteKind, ReferencedId, ReplyTarget, SubmitOutcome, contains_leaked_secret,
    extract_mention_token,
};
use notecraft::drafts::{Draft, DraftError, DraftKey, LinkSpan, NoteId};
use notecraft::settings::SettingsStore;

const SAMPLE_NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
    settings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    Mention,
    Guard,
    DraftRoundtrip,
    SubmitReply,
    SubmitRoot,
    ConfirmGate,
    CancelBlank,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mention" => Some(Self::Mention),
            "guard" => Some(Self::Guard),
            "draft_roundtrip" => Some(Self::DraftRoundtrip),
            "submit_reply" => Some(Self::SubmitReply),
            "submit_root" => Some(Self::SubmitRoot),
            "confirm_gate" => Some(Self::ConfirmGate),
            "cancel_blank" => Some(Self::CancelBlank),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Guard => "guard",
            Self::DraftRoundtrip => "draft_roundtrip",
            Self::SubmitReply => "submit_reply",
            Self::SubmitRoot => "submit_root",
            Self::ConfirmGate => "confirm_gate",
            Self::CancelBlank => "cancel_blank",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("compose session failed: {source}"))]
    Session {
        stage: &'static str,
        source: ComposeError,
    },
    #[snafu(display("event bus rejected the call: {source}"))]
    Bus {
        stage: &'static str,
        source: BusError,
    },
    #[snafu(display("draft fixture is invalid: {source}"))]
    DraftFixture {
        stage: &'static str,
        source: DraftError,
    },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

/// Session context plus a log of everything published on `send post`.
struct Fixture {
    context: ComposeContext,
    posts: Rc<RefCell<Vec<ComposeResult>>>,
}

impl Fixture {
    fn new(args: &RunnerArgs) -> RunnerResult<Self> {
        let settings = args
            .settings_path
            .clone()
            .map(SettingsStore::new)
            .map(|store| store.settings())
            .unwrap_or_default();
        let context = ComposeContext::from_settings(&settings);

        let posts = Rc::new(RefCell::new(Vec::new()));
        let sink = posts.clone();
        context
            .bus
            .subscribe::<Post, _>(move |result| sink.borrow_mut().push(result.clone()))
            .context(BusSnafu {
                stage: "fixture-subscribe-post",
            })?;

        Ok(Self { context, posts })
    }

    fn open(&self, request: ComposeRequest, stage: &'static str) -> RunnerResult<ComposeSession> {
        ComposeSession::open(&self.context, request).context(SessionSnafu { stage })
    }

    fn posts(&self) -> Vec<ComposeResult> {
        self.posts.borrow().clone()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    notecraft::logging::init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());
    if let Some(path) = args.settings_path.as_deref() {
        println!("settings_path={}", path.display());
    }

    match args.scenario {
        Scenario::Mention => run_mention(),
        Scenario::Guard => run_guard(),
        Scenario::DraftRoundtrip => run_draft_roundtrip(&args),
        Scenario::SubmitReply => run_submit_reply(&args),
        Scenario::SubmitRoot => run_submit_root(&args),
        Scenario::ConfirmGate => run_confirm_gate(&args),
        Scenario::CancelBlank => run_cancel_blank(&args),
        Scenario::All => run_all(&args),
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut settings_path = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            "--settings" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-settings-value",
                    arg: "--settings",
                })?;
                settings_path = Some(PathBuf::from(value));
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
        settings_path,
    })
}

fn check(
    scenario: &'static str,
    stage: &'static str,
    passed: bool,
    reason: &str,
) -> RunnerResult<()> {
    ensure!(
        passed,
        ScenarioFailedSnafu {
            stage,
            scenario,
            reason: reason.to_string(),
        }
    );
    Ok(())
}

fn run_mention() -> RunnerResult<()> {
    let full_key = format!("@{}", "a".repeat(64));
    let cases = [
        ("hello @al", Some("al")),
        ("line one\n@bob says", Some("bob")),
        ("no mention here", None),
        ("lonely @ sign", None),
        (full_key.as_str(), None),
    ];

    for (text, expected) in cases {
        check(
            "mention",
            "scenario-mention-extract",
            extract_mention_token(text) == expected,
            &format!("unexpected token for {text:?}"),
        )?;
    }

    println!("mention_cases={}", cases.len());
    println!("runner_ok=true");
    Ok(())
}

fn run_guard() -> RunnerResult<()> {
    let flagged = contains_leaked_secret(&format!("backup {SAMPLE_NSEC}"));
    let clean = !contains_leaked_secret("gm, nsec1 is the secret key prefix");
    println!("guard_flagged={flagged}");
    println!("guard_clean={clean}");

    check(
        "guard",
        "scenario-guard",
        flagged && clean,
        "secret key detection disagreed with fixtures",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_draft_roundtrip(args: &RunnerArgs) -> RunnerResult<()> {
    let fixture = Fixture::new(args)?;
    let draft = Draft::with_links(
        "see this thread",
        vec![LinkSpan::new(4..8, "https://example.com/t/1")],
    )
    .context(DraftFixtureSnafu {
        stage: "scenario-draft-roundtrip-fixture",
    })?;

    let mut session = fixture.open(ComposeRequest::default(), "scenario-draft-roundtrip-open")?;
    session.edit(draft).context(SessionSnafu {
        stage: "scenario-draft-roundtrip-edit",
    })?;
    session.close();

    let reopened = fixture.open(ComposeRequest::default(), "scenario-draft-roundtrip-reopen")?;
    let restored = reopened.text().to_string();
    println!("draft_restored={restored}");

    check(
        "draft_roundtrip",
        "scenario-draft-roundtrip",
        restored == "see https://example.com/t/1 thread" && reopened.buffer().links().is_empty(),
        "reopened draft does not match the normalized text",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_submit_reply(args: &RunnerArgs) -> RunnerResult<()> {
    let fixture = Fixture::new(args)?;
    let target = ReplyTarget::new(NoteId::new([0x42; 32]), Some(NoteKind::Chat));
    let references = vec![ReferencedId::new("e", target.id.to_hex())];

    let mut session = fixture.open(
        ComposeRequest::reply(target, references.clone()),
        "scenario-submit-reply-open",
    )?;
    session.set_text("  on my way  ").context(SessionSnafu {
        stage: "scenario-submit-reply-edit",
    })?;
    let outcome = session.request_submit().context(SessionSnafu {
        stage: "scenario-submit-reply-submit",
    })?;

    let published = fixture.posts();
    let draft_removed = fixture
        .context
        .drafts
        .get(&DraftKey::Reply(target.id))
        .is_none();
    println!("published_count={}", published.len());
    println!("draft_removed={draft_removed}");

    let SubmitOutcome::Submitted(post) = outcome else {
        return ScenarioFailedSnafu {
            stage: "scenario-submit-reply-outcome",
            scenario: "submit_reply",
            reason: format!("expected a submitted post, got {outcome:?}"),
        }
        .fail();
    };
    println!("post_kind={}", post.kind.as_u32());

    check(
        "submit_reply",
        "scenario-submit-reply",
        post.kind == NoteKind::Chat
            && post.content == "on my way"
            && post.references == references
            && published == vec![ComposeResult::Submitted(post.clone())]
            && draft_removed,
        "reply submission did not publish the expected post",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_submit_root(args: &RunnerArgs) -> RunnerResult<()> {
    let fixture = Fixture::new(args)?;
    let mut session = fixture.open(ComposeRequest::default(), "scenario-submit-root-open")?;
    session.set_text("gm").context(SessionSnafu {
        stage: "scenario-submit-root-edit",
    })?;
    let outcome = session.request_submit().context(SessionSnafu {
        stage: "scenario-submit-root-submit",
    })?;

    let root_draft = fixture.context.drafts.get(&DraftKey::Root);
    println!("root_draft_empty={}", root_draft.as_ref().is_some_and(Draft::is_empty));

    check(
        "submit_root",
        "scenario-submit-root",
        matches!(outcome, SubmitOutcome::Submitted(ref post) if post.kind == NoteKind::Text)
            && root_draft == Some(Draft::new()),
        "root submission did not reset the root draft",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_confirm_gate(args: &RunnerArgs) -> RunnerResult<()> {
    let fixture = Fixture::new(args)?;
    let mut session = fixture.open(ComposeRequest::default(), "scenario-confirm-gate-open")?;
    session
        .set_text(format!("my key {SAMPLE_NSEC}"))
        .context(SessionSnafu {
            stage: "scenario-confirm-gate-edit",
        })?;

    let first = session.request_submit().context(SessionSnafu {
        stage: "scenario-confirm-gate-submit",
    })?;
    let kept = session
        .confirm(Confirmation::KeepEditing)
        .context(SessionSnafu {
            stage: "scenario-confirm-gate-keep-editing",
        })?;
    let held_back = fixture.posts().is_empty();
    println!("held_back={held_back}");

    session.request_submit().context(SessionSnafu {
        stage: "scenario-confirm-gate-resubmit",
    })?;
    let posted = session
        .confirm(Confirmation::PostAnyway)
        .context(SessionSnafu {
            stage: "scenario-confirm-gate-post-anyway",
        })?;
    println!("published_count={}", fixture.posts().len());

    check(
        "confirm_gate",
        "scenario-confirm-gate",
        first == SubmitOutcome::AwaitingConfirmation
            && kept == SubmitOutcome::KeptEditing
            && held_back
            && matches!(posted, SubmitOutcome::Submitted(_))
            && fixture.posts().len() == 1,
        "secret key gate did not hold the post until confirmation",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_cancel_blank(args: &RunnerArgs) -> RunnerResult<()> {
    let fixture = Fixture::new(args)?;
    let kept_target = ReplyTarget::new(NoteId::new([1; 32]), None);
    let blank_target = ReplyTarget::new(NoteId::new([2; 32]), None);

    let mut session = fixture.open(
        ComposeRequest::reply(kept_target, Vec::new()),
        "scenario-cancel-blank-open-kept",
    )?;
    session.set_text("note one @xy").context(SessionSnafu {
        stage: "scenario-cancel-blank-edit-kept",
    })?;
    let token = session.mention_token().map(str::to_owned);
    session.cancel().context(SessionSnafu {
        stage: "scenario-cancel-blank-cancel-kept",
    })?;

    let mut blank = fixture.open(
        ComposeRequest::reply(blank_target, Vec::new()),
        "scenario-cancel-blank-open-blank",
    )?;
    blank.set_text("   ").context(SessionSnafu {
        stage: "scenario-cancel-blank-edit-blank",
    })?;
    blank.cancel().context(SessionSnafu {
        stage: "scenario-cancel-blank-cancel-blank",
    })?;

    let drafts = &fixture.context.drafts;
    let kept = drafts.get(&DraftKey::Reply(kept_target.id)) == Some(Draft::plain("note one @xy"));
    let removed = drafts.get(&DraftKey::Reply(blank_target.id)).is_none();
    println!("mention_token={}", token.as_deref().unwrap_or(""));
    println!("draft_kept={kept}");
    println!("blank_removed={removed}");

    check(
        "cancel_blank",
        "scenario-cancel-blank",
        token.as_deref() == Some("xy")
            && kept
            && removed
            && fixture.posts() == vec![ComposeResult::Cancelled, ComposeResult::Cancelled],
        "cancel did not keep the written draft and drop the blank one",
    )?;
    println!("runner_ok=true");
    Ok(())
}

fn run_all(args: &RunnerArgs) -> RunnerResult<()> {
    run_mention()?;
    run_guard()?;
    run_draft_roundtrip(args)?;
    run_submit_reply(args)?;
    run_submit_root(args)?;
    run_confirm_gate(args)?;
    run_cancel_blank(args)?;

    println!("all_passed=true");
    Ok(())
}
