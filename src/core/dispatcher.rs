use crate::core::error::LaunchError;
use crate::core::process::{ProcessHandle, Spawner};
use anyhow::Result;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, trace};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// Runs queued commands on a fixed set of GPU slots, one command per slot.
///
/// Slot `i` pins its command to `devices[i]` through the device environment
/// variable. Free slots are found by polling in ascending index order and the
/// queue is consumed front to back, so a command never starts before the
/// commands ahead of it.
pub struct GpuDispatcher<S: Spawner> {
    spawner: S,
    devices: Vec<u32>,
    poll_interval: Duration,
    device_env: String,
}

impl<S: Spawner> GpuDispatcher<S> {
    pub fn new(spawner: S, devices: Vec<u32>) -> Result<Self, LaunchError> {
        if devices.is_empty() {
            return Err(LaunchError::NoSlots);
        }

        Ok(Self {
            spawner,
            devices,
            poll_interval: DEFAULT_POLL_INTERVAL,
            device_env: DEFAULT_DEVICE_ENV.to_string(),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_device_env(mut self, device_env: impl Into<String>) -> Self {
        self.device_env = device_env.into();
        self
    }

    pub fn slot_count(&self) -> usize {
        self.devices.len()
    }

    /// Launch every command and block until all of them have exited.
    ///
    /// Exit statuses only mark a slot as free again; a failing command is
    /// neither retried nor reported to the caller.
    pub fn dispatch<I>(&self, commands: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut pending: VecDeque<String> = commands.into_iter().collect();
        let mut slots: Vec<Option<S::Handle>> = self.devices.iter().map(|_| None).collect();
        let total = pending.len();

        info!(
            "Dispatching {total} command(s) over {} GPU slot(s)",
            self.slot_count()
        );

        while !pending.is_empty() {
            let Some(slot) = self.find_free_slot(&mut slots)? else {
                trace!("All slots busy, sleeping {:?}", self.poll_interval);
                std::thread::sleep(self.poll_interval);
                continue;
            };

            let Some(command) = pending.pop_front() else {
                break;
            };
            let device = self.devices[slot].to_string();
            info!(
                "[{}/{total}] Launching on GPU {device} (slot {slot}): {command}",
                total - pending.len()
            );
            let handle = self
                .spawner
                .spawn(&command, &[(self.device_env.as_str(), device.as_str())])?;
            slots[slot] = Some(handle);
        }

        for (slot, handle) in slots.iter_mut().enumerate() {
            if let Some(handle) = handle {
                let status = handle.wait()?;
                debug!("Slot {slot} finished with {status}");
            }
        }

        info!("All {total} command(s) finished");
        Ok(())
    }

    fn find_free_slot(&self, slots: &mut [Option<S::Handle>]) -> Result<Option<usize>> {
        for (index, slot) in slots.iter_mut().enumerate() {
            match slot {
                None => return Ok(Some(index)),
                Some(handle) => {
                    if let Some(status) = handle.poll()? {
                        debug!("Slot {index} freed, previous command exited with {status}");
                        return Ok(Some(index));
                    }
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::testing::FakeSpawner;
    use crate::core::process::ShellSpawner;

    fn commands(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("python train.py --seed {i}")).collect()
    }

    fn dispatcher(spawner: FakeSpawner, slots: u32) -> GpuDispatcher<FakeSpawner> {
        GpuDispatcher::new(spawner, (0..slots).collect())
            .unwrap()
            .with_poll_interval(Duration::ZERO)
    }

    #[test]
    fn test_zero_slots_fails_fast() {
        let err = GpuDispatcher::new(FakeSpawner::new(0), vec![])
            .err()
            .unwrap();
        assert_eq!(err, LaunchError::NoSlots);
    }

    #[test]
    fn test_empty_queue_spawns_nothing() {
        let spawner = FakeSpawner::new(0);
        dispatcher(spawner.clone(), 2).dispatch(Vec::new()).unwrap();
        assert!(spawner.launches().is_empty());
    }

    #[test]
    fn test_launches_every_command_in_order() {
        let spawner = FakeSpawner::new(2);
        dispatcher(spawner.clone(), 3).dispatch(commands(10)).unwrap();

        assert_eq!(spawner.commands(), commands(10));
        assert_eq!(spawner.running(), 0);
        assert!(spawner.max_running() <= 3);
    }

    #[test]
    fn test_fills_slots_in_index_order() {
        let spawner = FakeSpawner::new(5);
        let dispatcher = GpuDispatcher::new(spawner.clone(), vec![4, 6])
            .unwrap()
            .with_poll_interval(Duration::ZERO);
        dispatcher.dispatch(commands(2)).unwrap();

        let devices: Vec<_> = spawner
            .launches()
            .into_iter()
            .map(|l| l.envs)
            .collect();
        assert_eq!(
            devices,
            vec![
                vec![("CUDA_VISIBLE_DEVICES".to_string(), "4".to_string())],
                vec![("CUDA_VISIBLE_DEVICES".to_string(), "6".to_string())],
            ]
        );
    }

    #[test]
    fn test_freed_slot_is_reused() {
        // one slot: every command must land on the same device, one at a time
        let spawner = FakeSpawner::new(1);
        let dispatcher = GpuDispatcher::new(spawner.clone(), vec![7])
            .unwrap()
            .with_poll_interval(Duration::ZERO)
            .with_device_env("HIP_VISIBLE_DEVICES");
        dispatcher.dispatch(commands(4)).unwrap();

        assert_eq!(spawner.max_running(), 1);
        for launch in spawner.launches() {
            assert_eq!(
                launch.envs,
                vec![("HIP_VISIBLE_DEVICES".to_string(), "7".to_string())]
            );
        }
    }

    #[test]
    fn test_failing_commands_do_not_stop_dispatch() {
        let spawner = FakeSpawner::new(0).exiting_with(1);
        dispatcher(spawner.clone(), 2).dispatch(commands(5)).unwrap();
        assert_eq!(spawner.launches().len(), 5);
    }

    #[test]
    fn test_spawn_failure_propagates() {
        let spawner = FakeSpawner::new(0).failing_on("python train.py --seed 1");
        let err = dispatcher(spawner.clone(), 2)
            .dispatch(commands(3))
            .unwrap_err();

        assert!(err.to_string().contains("Mock spawn failed"));
        assert_eq!(spawner.commands(), commands(1));
    }

    #[test]
    fn test_real_processes_two_slots() {
        let dispatcher = GpuDispatcher::new(ShellSpawner::new(), vec![0, 1])
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        let dir = tempfile::tempdir().unwrap();
        let cmds: Vec<String> = (0..3)
            .map(|i| format!("sleep 0 && touch {}", dir.path().join(i.to_string()).display()))
            .collect();

        dispatcher.dispatch(cmds).unwrap();

        for i in 0..3 {
            assert!(dir.path().join(i.to_string()).exists());
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every command launches exactly once, in queue order,
            /// and no more handles are alive than there are slots
            #[test]
            fn prop_dispatch_respects_slots(
                slots in 1u32..6,
                count in 0usize..25,
                polls in 0u32..4,
            ) {
                let spawner = FakeSpawner::new(polls);
                dispatcher(spawner.clone(), slots).dispatch(commands(count)).unwrap();

                prop_assert_eq!(spawner.commands(), commands(count));
                prop_assert!(spawner.max_running() <= slots as usize);
                prop_assert_eq!(spawner.running(), 0);
            }
        }
    }
}
