use crate::apps::App;
use crate::error::Error;
use core::convert::Infallible;
use defmt_or_log::warn;
use embedded_hal::delay::DelayNs;

/// Starts `app` and then runs a blocking loop that repeatedly calls its `step()`.
///
/// This is the simplest possible app manager, for firmware that runs a single app. The
/// host doubles as the delay provider between two steps.
///
/// # Arguments
/// - `app`: the app to run
/// - `host`: the hardware the app talks to, also a [`DelayNs`] provider
/// - `period_ms`: the pause between two steps; apps throttle themselves, so anything up to
///   their own cadence works
///
/// # Example
/// ```rust,ignore
/// use aospi::apps::sensors::SensorsApp;
/// use aospi::timer::run_app_loop;
///
/// let mut app = SensorsApp::new();
/// let Err(e) = run_app_loop(&mut app, &mut board, 10);
/// ```
///
/// # Notes
/// - Only returns when `start()` fails.
/// - A failing `step()` is logged and the loop goes on; the next step retries.
pub fn run_app_loop<A, H>(app: &mut A, host: &mut H, period_ms: u32) -> Result<Infallible, Error>
where
    A: App<H>,
    H: DelayNs,
{
    app.start(host)?;
    loop {
        if let Err(e) = app.step(host) {
            warn!("{}: step failed: {}", app.descriptor().name, e);
        }
        host.delay_ms(period_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{AppDescriptor, AppFlags};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    struct Failing;

    impl App<NoopDelay> for Failing {
        fn descriptor(&self) -> AppDescriptor {
            AppDescriptor {
                name: "failing",
                title: "Failing",
                xlabel: "",
                ylabel: "",
                flags: AppFlags::NONE,
            }
        }
        fn start(&mut self, _host: &mut NoopDelay) -> Result<(), Error> {
            Err(Error::NoI2cDevice)
        }
        fn step(&mut self, _host: &mut NoopDelay) -> Result<(), Error> {
            unreachable!()
        }
        fn stop(&mut self, _host: &mut NoopDelay) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn test_loop_returns_when_start_fails() {
        let mut app = Failing;
        assert_eq!(
            run_app_loop(&mut app, &mut NoopDelay::new(), 10),
            Err(Error::NoI2cDevice)
        );
    }
}
