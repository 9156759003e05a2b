use tracing::info;

/// Something worth telling people about once it has been committed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Joined {
        email: String,
        name: String,
        team: String,
        project: Option<String>,
    },
    Invited {
        email: String,
        project: String,
    },
}

/// Notification collaborator. Delivery is best-effort: a failure is logged
/// and never undoes the change which triggered it.
pub trait Notifier {
    fn notify(&self, event: &Event) -> eyre::Result<()>;
}

/// Notifier which only writes events to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) -> eyre::Result<()> {
        match event {
            Event::Joined {
                email,
                name,
                team,
                project,
            } => info!(%email, %name, %team, ?project, "student joined team"),
            Event::Invited { email, project } => {
                info!(%email, %project, "invitation sent");
            }
        }
        Ok(())
    }
}
