use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

use super::script::{Script, Step};
use crate::collab::{collab_extension, RemoteSelection, SelectionTracker};
use crate::config::Config;
use crate::core::{ActorId, Result, SyncError};
use crate::document::{Document, Subscription, Topic};
use crate::editor::{ChangeSpec, EditorState, EditorView, TransactionSpec, ViewHandle};
use crate::relay::Relay;

/// One participant of a replayed session
struct Participant {
    name: String,
    doc: Document,
    view: ViewHandle,
    selections: SelectionTracker,
    _events: Option<Subscription>,
}

/// Final state of one participant
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantOutcome {
    pub name: String,
    pub actor: ActorId,
    pub text: String,
    pub attached: bool,
    pub remote_selections: Vec<RemoteSelection>,
}

/// Result of replaying a script
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub document_key: String,
    pub relayed_changes: usize,
    /// Every attached participant ended with the same text
    pub converged: bool,
    pub participants: Vec<ParticipantOutcome>,
}

/// Replay `script` against a fresh relay, flushing all changes at the end
pub fn run(config: &Config, script: &Script) -> Result<ReplayOutcome> {
    let mut relay = Relay::new(config.document_key.clone());
    let events: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));

    let participants: Vec<Participant> = script
        .participants
        .iter()
        .map(|name| {
            let doc = relay.attach();
            let extension = collab_extension(&doc);
            let state = EditorState::new(&doc.content_text().unwrap_or_default());
            let view = EditorView::mount(state, &extension.plugins);

            let subscription = config.event_log.as_ref().map(|_| {
                let sink = events.clone();
                let name = name.clone();
                doc.subscribe(Topic::All, move |event| {
                    sink.borrow_mut()
                        .push(serde_json::json!({ "participant": name, "event": event }));
                })
            });

            Participant {
                name: name.clone(),
                doc,
                view,
                selections: extension.selections,
                _events: subscription,
            }
        })
        .collect();

    let mut relayed = 0;
    for (index, step) in script.steps.iter().enumerate() {
        debug!("Step {}: {:?}", index + 1, step);
        match step {
            Step::Edit {
                participant,
                from,
                to,
                insert,
            } => {
                let participant = find(&participants, participant)?;
                if !participant.doc.is_attached() {
                    return Err(SyncError::script(format!(
                        "step {}: '{}' is detached",
                        index + 1,
                        participant.name
                    )));
                }
                let change = ChangeSpec::replace(*from, to.unwrap_or(*from), insert.clone());
                participant
                    .view
                    .borrow_mut()
                    .dispatch(TransactionSpec::new().changes(vec![change]).user_event("input"))?;
            }
            Step::Sync => relayed += relay.sync()?,
            Step::Detach { participant } => {
                let participant = find(&participants, participant)?;
                relay.detach(&participant.doc)?;
                participant.view.borrow_mut().destroy();
            }
        }
    }
    relayed += relay.sync()?;

    if let Some(path) = &config.event_log {
        write_event_log(path, &events.borrow())?;
    }

    let outcomes: Vec<ParticipantOutcome> = participants
        .iter()
        .map(|p| ParticipantOutcome {
            name: p.name.clone(),
            actor: p.doc.actor(),
            text: p.view.borrow().text(),
            attached: p.doc.is_attached(),
            remote_selections: p.selections.decorations(&p.doc),
        })
        .collect();

    let mut attached_texts = outcomes.iter().filter(|o| o.attached).map(|o| &o.text);
    let converged = match attached_texts.next() {
        Some(first) => attached_texts.all(|text| text == first),
        None => true,
    };
    info!(
        "Replayed {} step(s) on {}, {} change(s) relayed",
        script.steps.len(),
        config.document_key,
        relayed
    );

    Ok(ReplayOutcome {
        document_key: config.document_key.clone(),
        relayed_changes: relayed,
        converged,
        participants: outcomes,
    })
}

fn find<'a>(participants: &'a [Participant], name: &str) -> Result<&'a Participant> {
    participants
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| SyncError::script(format!("unknown participant '{}'", name)))
}

fn write_event_log(path: &Path, events: &[Value]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for event in events {
        writeln!(file, "{}", serde_json::to_string(event)?)?;
    }
    Ok(())
}
