use crate::error::Error;
use crate::timer::Monotonic;
use crate::transport::{Link, Phy, Transport};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// A transport shared between the main loop and interrupt handlers.
pub type GlobalTransport<L, P, D, C> = Mutex<RefCell<Option<Transport<L, P, D, C>>>>;

/// Used to initialize the global static [`Transport`] for use with `critical_section`.
///
/// # Returns
/// * An empty slot, filled by [`global_transport_setup`]
///
/// # Example
/// ```rust,ignore
/// use aospi::timer::{GlobalTransport, global_transport_init};
///
/// static OSP: GlobalTransport<MyLink, MyPin, MyDelay, MyClock> = global_transport_init();
/// ```
pub const fn global_transport_init<L, P, D, C>() -> GlobalTransport<L, P, D, C> {
    Mutex::new(RefCell::new(None))
}

/// Initializes `transport` for `phy` and moves it into the global slot.
///
/// A transport already in the slot is dropped.
///
/// # Errors
/// Whatever [`Transport::init`] returns; the slot is left untouched in that case.
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     global_transport_setup(&OSP, Transport::new(pins, link, delay, clock), Phy::Mcub)?;
/// }
/// ```
pub fn global_transport_setup<L, P, D, C>(
    global: &'static GlobalTransport<L, P, D, C>,
    mut transport: Transport<L, P, D, C>,
    phy: Phy,
) -> Result<(), Error>
where
    L: Link,
    P: OutputPin,
    D: DelayNs,
    C: Monotonic,
{
    transport.init(phy)?;
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(transport));
    });
    Ok(())
}

/// Runs `f` on the global transport inside a critical section.
///
/// Returns `None` when the slot is empty.
///
/// # Example
/// ```rust,ignore
/// let hops = with_global_transport(&OSP, |osp| osp.txrx_hops(TXRX_HOPS_T_EXTRA_DEFAULT));
/// ```
pub fn with_global_transport<L, P, D, C, R>(
    global: &'static GlobalTransport<L, P, D, C>,
    f: impl FnOnce(&mut Transport<L, P, D, C>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}

/// Moves the transport out of the global slot, leaving it empty.
pub fn global_transport_take<L, P, D, C>(
    global: &'static GlobalTransport<L, P, D, C>,
) -> Option<Transport<L, P, D, C>> {
    critical_section::with(|cs| global.borrow(cs).take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeClock;
    use crate::transport::{ControlPins, Dir};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    /// A chain that never answers.
    struct Silent;

    impl Link for Silent {
        fn send(&mut self, _bytes: &[u8]) -> Result<(), Error> {
            Ok(())
        }
        fn arm(&mut self) -> Result<(), Error> {
            Ok(())
        }
        fn listen(&mut self) -> Result<(), Error> {
            Ok(())
        }
        fn activity(&mut self) -> Result<bool, Error> {
            Ok(false)
        }
        fn take(&mut self, _buf: &mut [u8]) -> Result<usize, Error> {
            Ok(0)
        }
        fn disarm(&mut self) {}
    }

    static OSP: GlobalTransport<Silent, PinMock, NoopDelay, FakeClock> = global_transport_init();

    fn set(states: &[PinState]) -> PinMock {
        let t: Vec<PinTransaction> = states.iter().map(|&s| PinTransaction::set(s)).collect();
        PinMock::new(&t)
    }

    #[test]
    fn test_global_transport_lifecycle() {
        assert_eq!(with_global_transport(&OSP, |osp| osp.phy()), None);

        let pins = ControlPins {
            out_oena: set(&[PinState::Low]),
            in_oena: set(&[PinState::Low]),
            in_msel: set(&[PinState::High]),
            dirl: set(&[PinState::Low, PinState::High]),
        };
        let transport = Transport::new(pins, Silent, NoopDelay::new(), FakeClock::new(1));
        global_transport_setup(&OSP, transport, Phy::Mcub).unwrap();

        assert_eq!(with_global_transport(&OSP, |osp| osp.phy()), Some(Phy::Mcub));
        assert_eq!(
            with_global_transport(&OSP, |osp| osp.dirmux_set(Dir::Loop)),
            Some(Ok(()))
        );

        let mut transport = global_transport_take(&OSP).unwrap();
        assert_eq!(transport.dirmux(), Ok(Dir::Loop));
        assert!(global_transport_take(&OSP).is_none());
        transport.pins.out_oena.done();
        transport.pins.in_oena.done();
        transport.pins.in_msel.done();
        transport.pins.dirl.done();
    }
}
