//! Tests for the per-universe progress display

#[cfg(test)]
mod tests {
    use crate::support::png_bytes;
    use multiverse::io::progress::{ProgressManager, status_line};
    use multiverse::orchestration::batch::Batch;
    use multiverse::orchestration::task::{TaskId, TaskState};
    use multiverse::universe::catalog::UNIVERSES;
    use multiverse::universe::prompt::build_tasks;

    // Tests each state renders its own line
    // Verified by rendering errors without the message
    #[test]
    fn test_status_lines() {
        assert_eq!(status_line(&TaskState::Pending), "generating…");
        assert!(status_line(&TaskState::Done(png_bytes(4, 4, [1, 1, 1]))).starts_with("✓ done"));
        assert_eq!(status_line(&TaskState::failed("timed out")), "✗ timed out");
    }

    // Tests a spinner is added per task
    // Verified by skipping tasks without a subscriber
    #[tokio::test]
    async fn test_track_adds_spinner_per_task() {
        let batch = Batch::new(1, build_tasks(&UNIVERSES)).expect("unique ids");
        let mut pm = ProgressManager::hidden();
        assert!(pm.is_empty());

        pm.track(&batch);

        assert_eq!(pm.len(), UNIVERSES.len());
        pm.finish(&batch);
    }

    // Tests finish renders every final state in batch order
    // Verified by leaving spinners on their last streamed message
    #[tokio::test]
    async fn test_finish_renders_final_states() {
        let batch = Batch::new(1, build_tasks(&UNIVERSES[..3])).expect("unique ids");
        let mut pm = ProgressManager::hidden();
        pm.track(&batch);

        let store = batch.store();
        store
            .complete(&TaskId::new("cyberpunk"), png_bytes(4, 4, [1, 1, 1]))
            .expect("transition");
        store
            .fail(&TaskId::new("post_apocalyptic"), "request rejected: content policy")
            .expect("transition");
        pm.finish(&batch);

        let messages = pm.messages();
        assert!(messages[0].starts_with("✓ done"));
        assert_eq!(messages[1], "generating…");
        assert_eq!(messages[2], "✗ request rejected: content policy");
    }

    // Tests the default manager starts empty
    // Verified by pre-populating bars on construction
    #[test]
    fn test_default_is_empty() {
        let pm = ProgressManager::default();
        assert_eq!(pm.len(), 0);
        assert!(pm.messages().is_empty());
    }
}
