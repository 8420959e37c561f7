use editor_sync::collab::{collab_extension, remote_transaction, SyncConfig, YSync};
use editor_sync::core::{ActorId, IndexRange, SessionId};
use editor_sync::document::{DocEvent, Document, EditValue, OperationInfo, Topic, CONTENT_PATH};
use editor_sync::editor::{
    Annotation, ChangeSpec, EditorState, EditorView, PluginFactory, TransactionSpec, ViewHandle,
};
use editor_sync::relay::Relay;
use std::cell::RefCell;
use std::rc::Rc;

fn mount(doc: &Document) -> ViewHandle {
    let factories: Vec<Box<dyn PluginFactory>> =
        vec![Box::new(YSync::new(SyncConfig::new(doc.clone())))];
    let state = EditorState::new(&doc.content_text().unwrap_or_default());
    EditorView::mount(state, &factories)
}

fn type_text(view: &ViewHandle, at: usize, text: &str) {
    view.borrow_mut()
        .dispatch(
            TransactionSpec::new()
                .changes(vec![ChangeSpec::insert(at, text)])
                .user_event("input"),
        )
        .unwrap();
}

fn edit_op(from: i64, to: i64, content: &str) -> OperationInfo {
    OperationInfo::Edit {
        path: CONTENT_PATH.to_string(),
        from,
        to,
        value: EditValue {
            content: content.to_string(),
        },
    }
}

#[test]
fn test_sync_origin_transaction_issues_no_mutation() {
    let mut relay = Relay::new("no-echo");
    let doc = relay.attach();
    let view = mount(&doc);

    let local_changes = Rc::new(RefCell::new(0));
    let counter = local_changes.clone();
    let _sub = doc.subscribe(Topic::All, move |event| {
        if matches!(event, DocEvent::LocalChange { .. }) {
            *counter.borrow_mut() += 1;
        }
    });

    view.borrow_mut()
        .dispatch(
            TransactionSpec::new()
                .changes(vec![ChangeSpec::insert(0, "synced")])
                .annotate(Annotation::SyncOrigin(SessionId::from(doc.actor()))),
        )
        .unwrap();

    assert_eq!(*local_changes.borrow(), 0);
    assert!(!doc.has_pending());
}

#[test]
fn test_remote_range_is_clamped() {
    let session = SessionId::from(ActorId(1));
    let event = DocEvent::RemoteChange {
        actor: ActorId(2),
        operations: vec![edit_op(-5, -1, "Z")],
    };

    let doc = Document::new("clamp", ActorId(1));
    let view = mount(&doc);
    let spec = remote_transaction(&event, session).unwrap();
    view.borrow_mut().dispatch(spec).unwrap();

    let view = view.borrow();
    let last = view.state().history().back().unwrap();
    let change = last.changes().iter().next().unwrap();
    assert_eq!((change.from_a, change.to_a), (0, 0));
    assert_eq!(view.text(), "Z");
}

#[test]
fn test_remote_operations_apply_in_order_as_one_transaction() {
    let doc = Document::new("order", ActorId(1));
    let view = mount(&doc);
    let event = DocEvent::RemoteChange {
        actor: ActorId(2),
        operations: vec![edit_op(0, 0, "A"), edit_op(1, 1, "B")],
    };

    let spec = remote_transaction(&event, SessionId::from(doc.actor())).unwrap();
    view.borrow_mut().dispatch(spec).unwrap();

    let view = view.borrow();
    assert_eq!(view.text(), "AB");
    assert_eq!(view.state().history().len(), 1);
}

#[test]
fn test_echo_does_not_duplicate_text() {
    let mut relay = Relay::new("echo");
    let alice = relay.attach();
    let view = mount(&alice);

    type_text(&view, 0, "abcd");
    type_text(&view, 2, "X");
    let changes = alice.take_pending();

    // The transport echoes alice's own changes straight back
    for change in &changes {
        alice.apply_change(change).unwrap();
    }

    assert_eq!(view.borrow().text(), "abXcd");
    assert_eq!(alice.content_text().as_deref(), Some("abXcd"));
}

#[test]
fn test_echo_dispatched_with_sync_origin_is_not_rebroadcast() {
    let doc = Document::new("echo", ActorId(1));
    let view = mount(&doc);
    type_text(&view, 0, "ab");
    type_text(&view, 2, "X");
    doc.take_pending();

    // The same edit comes back as a remote event
    let event = DocEvent::RemoteChange {
        actor: ActorId(2),
        operations: vec![edit_op(2, 3, "X")],
    };
    let spec = remote_transaction(&event, SessionId::from(doc.actor())).unwrap();
    view.borrow_mut().dispatch(spec).unwrap();

    assert_eq!(view.borrow().text(), "abX");
    assert!(!doc.has_pending());
    assert_eq!(doc.content_text().as_deref(), Some("abX"));
}

#[test]
fn test_presence_stays_within_grown_document() {
    let mut relay = Relay::new("presence");
    let alice = relay.attach();
    let view = mount(&alice);

    type_text(&view, 0, "hello");
    assert_eq!(alice.with_content(|text| text.len()), Some(5));
    type_text(&view, 5, "!!!");
    assert_eq!(alice.with_content(|text| text.len()), Some(8));

    let selection = alice.resolve_selection(alice.actor()).unwrap();
    assert!(selection.fits(8));
    assert_eq!(selection, IndexRange::caret(8));
}

#[test]
fn test_first_local_edit_creates_content() {
    let mut relay = Relay::new("lazy");
    let alice = relay.attach();
    let view = mount(&alice);
    assert_eq!(alice.content_text(), None);

    type_text(&view, 0, "first");
    assert_eq!(alice.content_text().as_deref(), Some("first"));

    relay.sync().unwrap();
    assert_eq!(relay.server().content_text().as_deref(), Some("first"));
}

#[test]
fn test_collab_extension_installs_bridge_and_selections() {
    let mut relay = Relay::new("extension");
    let doc = relay.attach();
    let extension = collab_extension(&doc);
    let view = EditorView::mount(EditorState::new(""), &extension.plugins);

    // One subscription for content, one for presence
    assert_eq!(doc.subscriber_count(), 2);
    type_text(&view, 0, "x");
    assert!(doc.has_pending());

    drop(view);
    assert_eq!(doc.subscriber_count(), 0);
    assert!(extension.selections.is_empty());
}
