//! Location echo.
//!
//! Reacts to shared locations and venues with an OpenStreetMap link.

use crate::bot::handler::{CommandContext, CommandHandler, MediaTrigger, Trigger};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};

pub struct GpsPlugin;

impl Plugin for GpsPlugin {
    fn name(&self) -> &'static str {
        "gps"
    }

    fn handlers(&self, _me: &BotIdentity) -> Handlers {
        Handlers {
            commands: vec![
                CommandHandler::new(Trigger::Media(MediaTrigger::Location), on_location),
                CommandHandler::new(Trigger::Media(MediaTrigger::Venue), on_location),
            ],
            ..Default::default()
        }
    }
}

async fn on_location(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(point) = ctx.message.location else {
        return Ok(());
    };

    let (lat, lon) = (point.latitude, point.longitude);
    ctx.reply(&format!(
        "📍 <a href=\"https://www.openstreetmap.org/?mlat={lat}&amp;mlon={lon}#map=16/{lat}/{lon}\">{lat}, {lon}</a>"
    ))
    .await
}
