//! Integration tests: demo bot events and buttons driven through the dispatcher.

mod common;

use std::sync::Arc;

use dbot_core::{Chat, Color, FieldValue, Reaction};
use dbot_interact::{
    ActionRegistry, AppEvents, Broadcaster, DispatchOutcome, InteractionDispatcher, PollMonitor,
    PollMonitorConfig,
};
use dbot_cli::{DemoUserBot, HELP_REACTION};

use common::mock_transport::{interaction, MockTransport};

struct Harness {
    transport: Arc<MockTransport>,
    monitor: Arc<PollMonitor>,
    bot: Arc<DemoUserBot>,
    dispatcher: InteractionDispatcher,
}

fn harness() -> Harness {
    let transport = MockTransport::new();
    let registry = Arc::new(ActionRegistry::default());
    let broadcaster = Arc::new(Broadcaster::new(
        transport.clone(),
        registry.clone(),
        vec![Chat::with_id(-100)],
    ));
    let monitor = Arc::new(PollMonitor::new(
        transport.clone(),
        broadcaster.clone(),
        PollMonitorConfig::default(),
    ));
    let bot = DemoUserBot::new("DemoBot", broadcaster.clone(), monitor.clone());
    let events: Arc<dyn AppEvents> = bot.clone();
    let dispatcher = InteractionDispatcher::new(registry, transport.clone(), broadcaster, events);
    Harness {
        transport,
        monitor,
        bot,
        dispatcher,
    }
}

/// Token of the greeting button whose label is `label`.
async fn token_of(h: &Harness, label: &str) -> String {
    let prompts = h.transport.prompts().await;
    prompts
        .iter()
        .rev()
        .flat_map(|p| p.controls.iter())
        .find(|c| c.label == label)
        .and_then(|c| c.token())
        .map(str::to_string)
        .unwrap_or_else(|| panic!("no button labelled {}", label))
}

/// **Test: Connecting posts the greeting with the four help buttons.**
///
/// Setup: demo bot with one audience chat.
/// Action: on_connected.
/// Expected: "Hello I'm DemoBot" titled "Bot started", purple, with four action buttons.
#[tokio::test]
async fn test_greeting_has_help_buttons() {
    let h = harness();
    h.bot.on_connected().await;

    let prompts = h.transport.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].content, "Hello I'm DemoBot");
    assert_eq!(prompts[0].title.as_deref(), Some("Bot started"));
    assert_eq!(prompts[0].color, Some(Color::PURPLE));
    let labels: Vec<&str> = prompts[0].controls.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Test send message", "Generate a random string", "Display help", "Start a poll"]
    );
}

/// **Test: The random string button asks for a length, then answers with a string of that length.**
///
/// Setup: greeting posted.
/// Action: press "Generate a random string", submit length 12.
/// Expected: a form with the `length` field, then a payload "Random string: <12 chars>".
#[tokio::test]
async fn test_random_string_flow() {
    let h = harness();
    h.bot.on_connected().await;
    let token = token_of(&h, "Generate a random string").await;

    let outcome = h.dispatcher.on_trigger(&interaction(1), &token).await;
    assert_eq!(outcome, DispatchOutcome::InputRequested);
    let forms = h.transport.forms().await;
    assert_eq!(forms[0].fields[0].id, "length");

    let outcome = h
        .dispatcher
        .on_form_submit(&interaction(1), &token, &[FieldValue::text("length", "12")])
        .await;
    match outcome {
        DispatchOutcome::Completed { payload: Some(payload) } => {
            let value = payload.content.strip_prefix("Random string: ").unwrap();
            assert_eq!(value.len(), 12);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_random_string_rejects_out_of_range_length() {
    let h = harness();
    h.bot.on_connected().await;
    let token = token_of(&h, "Generate a random string").await;
    h.dispatcher.on_trigger(&interaction(1), &token).await;

    let outcome = h
        .dispatcher
        .on_form_submit(&interaction(1), &token, &[FieldValue::text("length", "500")])
        .await;
    match outcome {
        DispatchOutcome::Completed { payload: Some(payload) } => {
            assert_eq!(payload.content, "String length must be between 1 and 100");
            assert_eq!(payload.color, Some(Color::ERROR));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// **Test: A stale button re-posts the latest buttons.**
///
/// Setup: no actions registered for "abc123".
/// Action: trigger "abc123".
/// Expected: NotFound, and a "Latest interaction buttons" message with fresh controls.
#[tokio::test]
async fn test_stale_button_reposts_buttons() {
    let h = harness();

    let outcome = h.dispatcher.on_trigger(&interaction(1), "abc123").await;

    assert_eq!(outcome, DispatchOutcome::NotFound);
    let prompts = h.transport.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].title.as_deref(), Some("Latest interaction buttons"));
    assert_eq!(prompts[0].controls.len(), 4);
}

#[tokio::test]
async fn test_mentions() {
    let h = harness();

    h.bot.on_mention("!help").await;
    h.bot.on_mention("weather").await;

    let prompts = h.transport.prompts().await;
    assert_eq!(prompts[0].title.as_deref(), Some("Bot Help"));
    assert_eq!(prompts[1].content, "Unknown command: weather");
    assert_eq!(prompts[1].color, Some(Color::RED));
}

/// **Test: The poll button requires confirmation, then sends and tracks a poll.**
///
/// Setup: greeting posted.
/// Action: press "Start a poll", then the confirmation button.
/// Expected: no poll after the first press; after confirming one multiselect poll with three
/// answers is sent and tracked.
#[tokio::test]
async fn test_poll_button_sends_tracked_poll() {
    let h = harness();
    h.bot.on_connected().await;
    let token = token_of(&h, "Start a poll").await;

    let confirm = match h.dispatcher.on_trigger(&interaction(1), &token).await {
        DispatchOutcome::ConfirmationRequested { token } => token,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(h.transport.polls().await.is_empty());

    let outcome = h.dispatcher.on_trigger(&interaction(1), &confirm).await;
    assert!(matches!(outcome, DispatchOutcome::Completed { .. }));

    let polls = h.transport.polls().await;
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].answers.len(), 3);
    assert!(polls[0].allow_multiselect);
    assert_eq!(h.monitor.tracked().await.len(), 1);
}

/// **Test: Reacting to the greeting with the help glyph shows the help.**
///
/// Setup: greeting posted.
/// Action: one 👍 reaction on the greeting, then a second one from another user.
/// Expected: the first posts "Bot Help"; the second (count 2) runs nothing.
#[tokio::test]
async fn test_greeting_reaction_displays_help() {
    let h = harness();
    h.bot.on_connected().await;
    let greeting_id = h.transport.prompt_handles().await[0].message_id.clone();
    let reaction = |count| Reaction {
        chat: Chat::with_id(-100),
        message_id: greeting_id.clone(),
        user: interaction(1).user,
        emoji: HELP_REACTION.to_string(),
        count,
    };

    let outcome = h.dispatcher.on_reaction("rx-1", &reaction(1)).await;
    assert_eq!(outcome, Some(DispatchOutcome::Completed { payload: None }));
    let prompts = h.transport.prompts().await;
    assert_eq!(prompts.last().unwrap().title.as_deref(), Some("Bot Help"));

    assert_eq!(h.dispatcher.on_reaction("rx-2", &reaction(2)).await, None);
}
