//! Notification inbox command handlers.

use tabled::Tabled;

use reelhouse_core::{AppContext, UserNotification};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Read")]
    read: &'static str,
}

impl From<&UserNotification> for NotificationRow {
    fn from(n: &UserNotification) -> Self {
        Self {
            id: n.notification_id,
            message: n.message.clone(),
            created: n.created_at.clone().unwrap_or_else(|| "-".into()),
            read: if n.read { "yes" } else { "no" },
        }
    }
}

pub async fn handle(
    ctx: &AppContext,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::require_session(ctx)?;
    let service = ctx.notifications();

    match args.command {
        NotificationsCommand::List => {
            let notifications = util::completed(ctx, service.fetch().await)?;
            let out = output::render_list(
                global.output,
                &notifications,
                |n| NotificationRow::from(n),
                |n| n.notification_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Delete { id } => util::succeeded(ctx, service.delete(id).await),

        NotificationsCommand::Clear => {
            if !util::confirm("Delete all notifications?", global.yes)? {
                return Ok(());
            }
            util::succeeded(ctx, service.clear_all().await)
        }
    }
}
