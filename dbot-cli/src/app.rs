//! Wires the Telegram transport, the interaction engine and the demo bot together.

use std::sync::Arc;

use anyhow::Result;
use dbot_core::Chat;
use dbot_interact::{ActionRegistry, AppEvents, Broadcaster, InteractionDispatcher, PollMonitor};
use dbot_telegram::{run_repl, ConnectRetry, TelegramTransport, UpdateRouter};
use teloxide::Bot;
use tracing::{info, instrument};

use crate::config::BotConfig;
use crate::demo::DemoUserBot;

pub struct BotApp {
    bot: Bot,
    router: Arc<UpdateRouter>,
    monitor: Arc<PollMonitor>,
    broadcaster: Arc<Broadcaster>,
    retry: ConnectRetry,
}

impl BotApp {
    #[instrument(skip(config), fields(channels = config.channels.len()))]
    pub fn build(config: &BotConfig, name: &str) -> Self {
        let bot = config.telegram().build_bot();
        let transport = Arc::new(TelegramTransport::new(bot.clone()));
        let registry = Arc::new(ActionRegistry::new(config.registry_config()));
        let audience: Vec<Chat> = config.channels.iter().copied().map(Chat::with_id).collect();

        let broadcaster = Arc::new(
            Broadcaster::new(transport.clone(), registry.clone(), audience)
                .with_outbound_delay(config.outbound_delay()),
        );
        let monitor = Arc::new(PollMonitor::new(
            transport.clone(),
            broadcaster.clone(),
            config.poll_monitor_config(),
        ));

        let events: Arc<dyn AppEvents> = DemoUserBot::new(name, broadcaster.clone(), monitor.clone());
        let dispatcher = Arc::new(InteractionDispatcher::new(
            registry,
            transport.clone(),
            broadcaster.clone(),
            events.clone(),
        ));
        let router = Arc::new(UpdateRouter::new(
            transport,
            dispatcher,
            events,
            config.channels.iter().copied(),
        ));

        info!(name = %name, "Bot assembled");
        Self {
            bot,
            router,
            monitor,
            broadcaster,
            retry: config.connect_retry(),
        }
    }

    /// Broadcaster of the default audience, kept by the caller for the final broadcast.
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    pub async fn run(self) -> Result<()> {
        run_repl(self.bot, self.router, self.monitor, self.retry).await
    }
}
