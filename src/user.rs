use rand::seq::IndexedRandom;
use std::time::Duration;

use crate::swarm::{Behavior, SwarmUser, SwarmUserCommand, TaskFunction};

/// Never sleep longer than this in one go, so a pacing user notices the exit command.
const MAXIMUM_SLEEP_MS: u64 = 500;

pub(crate) async fn user_main(
    thread_number: usize,
    thread_behavior: Behavior,
    mut thread_user: SwarmUser,
    thread_receiver: flume::Receiver<SwarmUserCommand>,
) {
    info!(
        "launching user {} from {}...",
        thread_number, thread_behavior.name
    );

    if thread_behavior.weighted_tasks.is_empty() {
        warn!(
            "user {} from {} has no tasks to run",
            thread_number, thread_behavior.name
        );
    }

    // Loop launching tasks until parent tells us to stop.
    'launch_tasks: loop {
        // Determine which task we're going to run next.
        let thread_task_index =
            match thread_behavior.weighted_tasks.choose(thread_user.rng()) {
                Some(index) => *index,
                None => break 'launch_tasks,
            };
        let thread_task = &thread_behavior.tasks[thread_task_index];
        debug!(
            "[user {}]: launching {} task from {}",
            thread_number, thread_task.name, thread_behavior.name
        );
        invoke_task_function(
            &thread_task.function,
            &mut thread_user,
            thread_number,
            &thread_task.name,
        )
        .await;

        if received_exit(&thread_receiver) {
            break 'launch_tasks;
        }

        // If pacing is defined, wait for a random time between tasks.
        if let Some(pacing) = thread_behavior.pacing {
            let mut wait_time = pacing.sample(thread_user.rng());
            let maximum_sleep_time = Duration::from_millis(MAXIMUM_SLEEP_MS);

            while wait_time > Duration::ZERO {
                // Exit immediately if message received from parent.
                if received_exit(&thread_receiver) {
                    break 'launch_tasks;
                }

                // Wake regularly to detect if the swarm has shut down.
                let sleep_duration = wait_time.min(maximum_sleep_time);
                wait_time -= sleep_duration;

                trace!(
                    "user {} from {} sleeping {:?} ...",
                    thread_number,
                    thread_behavior.name,
                    sleep_duration
                );

                tokio::time::sleep(sleep_duration).await;
            }
        }
    }

    info!(
        "exiting user {} from {}...",
        thread_number, thread_behavior.name
    );
}

// Determine if the parent has sent a SwarmUserCommand::Exit message, or went away.
fn received_exit(thread_receiver: &flume::Receiver<SwarmUserCommand>) -> bool {
    match thread_receiver.try_recv() {
        Ok(SwarmUserCommand::Exit) => true,
        Err(flume::TryRecvError::Disconnected) => true,
        Err(flume::TryRecvError::Empty) => false,
    }
}

// Invoke the task function. A failed request is logged, the user keeps going.
async fn invoke_task_function(
    function: &TaskFunction,
    thread_user: &mut SwarmUser,
    thread_number: usize,
    thread_task_name: &str,
) {
    if let Err(e) = function(thread_user).await {
        warn!(
            "[user {}]: {} task failed: {}",
            thread_number, thread_task_name, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpClient, SwarmResponse};
    use crate::logger::StdoutDiagnostics;
    use crate::swarm::{Scheduler, TaskError, TaskResult};
    use crate::task;
    use async_trait::async_trait;
    use http::StatusCode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Counts GET requests without touching the network.
    #[derive(Default)]
    struct CountingClient {
        gets: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for CountingClient {
        async fn post(
            &self,
            _path: &str,
            _body: &Value,
            _headers: &[(&str, &str)],
        ) -> Result<SwarmResponse, TaskError> {
            unreachable!("only GET is used here")
        }

        async fn get(&self, _path: &str) -> Result<SwarmResponse, TaskError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(SwarmResponse {
                status: StatusCode::OK,
                body: String::new(),
            })
        }
    }

    async fn ping(user: &mut SwarmUser) -> TaskResult {
        let _response = user.get("/ping").await?;
        Ok(())
    }

    fn user(client: Arc<CountingClient>) -> SwarmUser {
        SwarmUser::new(0, client, StdRng::seed_from_u64(0), Arc::new(StdoutDiagnostics))
    }

    #[test]
    fn exit_command() {
        let (sender, receiver) = flume::unbounded();
        assert!(!received_exit(&receiver));
        sender.send(SwarmUserCommand::Exit).unwrap();
        assert!(received_exit(&receiver));
        drop(sender);
        assert!(received_exit(&receiver));
    }

    #[tokio::test]
    async fn user_runs_until_exit() {
        let client = Arc::new(CountingClient::default());
        let mut behavior = Behavior::new("ping");
        behavior.register_task(task!(ping).set_name("ping")).unwrap();
        behavior.set_pacing(0.01, 0.02).unwrap();

        let (sender, receiver) = flume::unbounded();
        let handle = tokio::spawn(user_main(0, behavior, user(client.clone()), receiver));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sender.send(SwarmUserCommand::Exit).unwrap();
        handle.await.unwrap();

        assert!(client.gets.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn user_without_tasks_exits() {
        let client = Arc::new(CountingClient::default());
        let (_sender, receiver) = flume::unbounded();
        user_main(0, Behavior::new("empty"), user(client.clone()), receiver).await;
        assert_eq!(client.gets.load(Ordering::SeqCst), 0);
    }
}
