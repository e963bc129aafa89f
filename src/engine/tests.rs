use crate::{
    CHOICES_KEY, CHOSEN_KEY, Choices, Dispatcher, IntentsDb, Layer, LayerKind, MatchError, Options, Pattern,
    PatternSet, Request, Score, Stack, TransitionRegister, TriggerSpec,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn intents() -> Arc<IntentsDb> {
    let mut db = IntentsDb::new("en");
    db.insert("HELLO", "en", ["hello", "hi", "hey"]);
    db.insert("HELP", "en", ["help", "I need help", "what can you do"]);
    Arc::new(db)
}

fn yes_no_register() -> TransitionRegister {
    let db = intents();
    let mut builder = Choices::builder(&db);
    builder.add("yes", None, Some("Yes")).unwrap().add("no", None, Some("No")).unwrap();
    let mut register = TransitionRegister::new();
    builder.build().store(&mut register).unwrap();
    register
}

fn request(layers: Vec<Layer>, register: TransitionRegister) -> Request {
    Request::new(Stack::new(layers), register).with_intents(intents())
}

#[test]
fn text_pattern_round_trip() {
    let mut set = PatternSet::new();
    set.register("text", "(Text|RawText)+ QuickRepliesList?").unwrap();

    let mut stack = Stack::new(vec![
        Layer::raw_text("one"),
        Layer::raw_text("two"),
        Layer::QuickRepliesList { options: vec![] },
    ]);
    assert_eq!(set.accept(&mut stack).unwrap(), "text");
    assert_eq!(stack.annotation.as_deref(), Some("text"));

    let mut postback = Stack::new(vec![Layer::Postback { payload: serde_json::Value::Null }]);
    assert!(matches!(set.accept(&mut postback), Err(MatchError::NoPatternMatched { .. })));
}

#[test]
fn malformed_pattern_fails_at_registration() {
    assert!(matches!(Pattern::compile("(Text|"), Err(MatchError::MalformedPattern { .. })));

    let mut set = PatternSet::new();
    assert!(set.register("broken", "(Text|").is_err());
    assert!(set.find(&[LayerKind::Text]).is_none());
}

#[test]
fn choice_prefers_closest_slug() {
    let mut d = Dispatcher::new();
    d.register("choice", TriggerSpec::choice(None)).unwrap();

    let mut req = request(vec![Layer::raw_text("yess")], yes_no_register());
    let selection = d.dispatch(&mut req).unwrap();
    let chosen = selection.chosen.clone().unwrap();
    assert_eq!(chosen.slug, "yes");

    // The same text against each choice alone.
    let yes = crate::trigram::best_match("yess", &["Yes"]);
    let no = crate::trigram::best_match("yess", &["No"]);
    assert!(yes > no);
    assert_eq!(selection.score, Score::new(yes));
}

#[test]
fn quick_reply_wins_over_text() {
    let mut d = Dispatcher::new();
    d.register("choice", TriggerSpec::choice(None)).unwrap();

    let mut req = request(vec![Layer::raw_text("yes"), Layer::quick_reply("no")], yes_no_register());
    let selection = d.dispatch(&mut req).unwrap();
    assert_eq!(selection.score, Score::PERFECT);
    assert_eq!(selection.chosen.map(|c| c.slug), Some("no".to_string()));
}

#[test]
fn ties_go_to_first_registered() {
    let db = intents();
    let build = |order: [&str; 2]| {
        let mut d = Dispatcher::new();
        for name in order {
            let spec = match name {
                "anything" => TriggerSpec::anything(),
                _ => TriggerSpec::text(&db, "HELLO").unwrap(),
            };
            d.register(name, spec).unwrap();
        }
        d
    };

    let hello = || request(vec![Layer::raw_text("hello")], TransitionRegister::new());
    let first = build(["anything", "hello"]).dispatch(&mut hello());
    let second = build(["hello", "anything"]).dispatch(&mut hello());

    assert_eq!(first.unwrap().trigger, "anything");
    assert_eq!(second.unwrap().trigger, "hello");
}

#[test]
fn empty_registry_never_picks_a_default() {
    let d = Dispatcher::new();
    let mut req = request(vec![Layer::raw_text("hello")], TransitionRegister::new());
    assert!(matches!(d.dispatch(&mut req), Err(MatchError::NoTriggerMatched)));
    assert!(matches!(d.dispatch_with(&mut req, &Options { parallel: true }), Err(MatchError::NoTriggerMatched)));
}

#[test]
fn only_the_winner_is_patched() {
    let db = intents();
    let mut d = Dispatcher::new();
    d.register("hello", TriggerSpec::text(&db, "HELLO").unwrap()).unwrap();
    d.register("choice", TriggerSpec::choice(None)).unwrap();

    // "hello" beats the choices, so the pending choices must survive.
    let mut req = request(vec![Layer::raw_text("hello")], yes_no_register());
    let selection = d.dispatch(&mut req).unwrap();
    assert_eq!(selection.trigger, "hello");
    assert!(req.register().contains(CHOICES_KEY));
    assert!(!req.register().contains(CHOSEN_KEY));

    // A tapped choice wins and is committed.
    let mut req = request(vec![Layer::quick_reply("yes")], yes_no_register());
    let selection = d.dispatch(&mut req).unwrap();
    assert_eq!(selection.trigger, "choice");
    let register = req.into_register();
    assert!(!register.contains(CHOICES_KEY));
    assert_eq!(register.chosen().unwrap().map(|c| c.slug), Some("yes".to_string()));
}

#[test]
fn restricted_choices_route_to_their_trigger() {
    let mut d = Dispatcher::new();
    d.register("said_yes", TriggerSpec::choice(Some("yes"))).unwrap();
    d.register("said_no", TriggerSpec::choice(Some("no"))).unwrap();

    let mut req = request(vec![Layer::raw_text("no")], yes_no_register());
    assert_eq!(d.dispatch(&mut req).unwrap().trigger, "said_no");

    let mut req = request(vec![Layer::quick_reply("yes")], yes_no_register());
    assert_eq!(d.dispatch(&mut req).unwrap().trigger, "said_yes");
}

#[test]
fn verbose_dispatch_reports_every_trigger() {
    let db = intents();
    let mut d = Dispatcher::new();
    d.register("help", TriggerSpec::text(&db, "HELP").unwrap()).unwrap();
    d.register("choice", TriggerSpec::choice(None)).unwrap();
    d.register("fallback", TriggerSpec::anything()).unwrap();

    let mut req = request(vec![Layer::raw_text("i need some help")], TransitionRegister::new());
    let verbose = d.dispatch_verbose_with(&mut req, &Options::default());

    let names: Vec<&str> = verbose.details.triggers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["help", "choice", "fallback"]);
    let variants: Vec<&str> = verbose.details.triggers.iter().map(|t| t.variant).collect();
    assert_eq!(variants, ["Text", "Choice", "Anything"]);
    assert_eq!(verbose.result.unwrap().trigger, "fallback");
    assert!(verbose.details.metrics.ranking <= verbose.details.metrics.total);
}
