use gab::tasks::{Event, EventMonitor};

/// Prints task progress to stdout as it happens
pub struct ProgressPrinter;

impl EventMonitor<Event> for ProgressPrinter {
    fn on_event(&self, evt: Event) {
        match evt {
            Event::StoppingApp => println!("stopping target app"),
            Event::CapturingMetadata => println!("capturing file ownership"),
            Event::Copying { src, dst } => println!("copying {} -> {}", src, dst),
            Event::ExtractingIdentifiers => println!("extracting identifiers"),
            Event::IdentifiersExtracted { missing } => {
                if missing.is_empty() {
                    println!("all identifiers captured");
                } else {
                    println!("missing identifiers: {}", missing.join(", "));
                }
            }
            Event::ApplyingSsaid => println!("injecting android id"),
            Event::SsaidApplied { ok } => {
                if ok {
                    println!("android id injected");
                } else {
                    println!("android id injection failed (continuing)");
                }
            }
            Event::RestoringOwnership => println!("restoring file ownership"),
            Event::IdentityChannelWritten { ok } => {
                if !ok {
                    println!("warning: identity channel file not written");
                }
            }
            Event::RecordPersisted { id } => println!("record saved with id {}", id),
        }
    }
}
