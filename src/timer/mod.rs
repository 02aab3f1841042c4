//! Time sources, round trip timing model and app loop utilities.
//!
//! The transport stamps the start and end of every round trip, and the sensors app throttles
//! its animation, all through an explicit [`Monotonic`] clock passed in by the caller instead
//! of a global `millis()`. Tests drive these with a fake clock.
//!
//! Contains:
//! - [`Monotonic`]: microsecond time source
//! - [`estimate_hops`]: number of nodes a round trip traversed, from its trip time
//! - `run_app_loop`: blocking app loop for `DelayNs` (feature `delay-loop`)
//! - `global_transport_setup` and `with_global_transport`: critical-section guarded
//!   transport shared with interrupt handlers (feature `global`)
//!
//! ## Timing model
//!
//! A BiDir trip to the node `k` hops away takes
//!
//! `t_trip = k×t_fwd + t_cmd + t_exec + t_delay + t_resp + k×t_fwd`
//!
//! and a Loop trip on a chain of `n` nodes takes
//!
//! `t_trip = (n-1)×t_fwd + t_cmd + t_exec + t_delay + t_resp`
//!
//! with `t_fwd = 7.5 µs` per hop and the telegrams clocked at 2.4 MHz.

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "global")]
mod isr;
#[cfg_attr(feature = "global", allow(unused_imports))]
#[cfg(feature = "global")]
pub use isr::*;

/// A free running microsecond clock.
///
/// Implementations must never go backwards. Wrapping is not handled; a `u64` of
/// microseconds lasts for several hundred thousand years.
pub trait Monotonic {
    /// Microseconds since an arbitrary, fixed epoch.
    fn now_us(&self) -> u64;

    /// Milliseconds since the same epoch.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Time (µs) to clock `size` telegram bytes at 2.4 MHz, rounded.
///
/// `*8` for bits per byte, `*10` to keep one decimal, `+12` rounds the division by 24.
pub const fn bits_us(size: usize) -> u32 {
    ((size as u32) * 8 * 10 + 12) / 24
}

/// Estimates the number of hops of a round trip.
///
/// # Arguments
/// - `trip_us`: measured trip time, software overhead already removed
/// - `size`: command plus response size in bytes
/// - `t_extra`: execution time plus the artificial node delay, typically
///   [`TXRX_HOPS_T_EXTRA_DEFAULT`](crate::consts::TXRX_HOPS_T_EXTRA_DEFAULT)
///
/// # Returns
/// The trip time not spent on clocking bits or executing, divided by the 7.5 µs per hop
/// forwarding delay, rounded to nearest. Returns 0 when the processing time alone exceeds
/// the trip time.
///
/// In BiDir the node at address `a` is `2(a-1)` hops away, so `hops/2+1` estimates its
/// address. The variance grows with the distance.
pub fn estimate_hops(trip_us: u32, size: usize, t_extra: u32) -> u32 {
    let t_proc = bits_us(size) + t_extra;
    if t_proc > trip_us {
        return 0;
    }
    let t_hop = trip_us - t_proc;
    // (t_hop + 7.5/2) / 7.5, scaled by 100
    (t_hop * 100 + 375) / 750
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_trip_gives_zero() {
        // 8 bytes take 27 µs, plus 5 µs extra
        assert_eq!(bits_us(8), 27);
        assert_eq!(estimate_hops(0, 8, 5), 0);
        assert_eq!(estimate_hops(31, 8, 5), 0);
        assert_eq!(estimate_hops(32, 8, 5), 0);
    }

    #[test]
    fn test_hops_rounding() {
        assert_eq!(estimate_hops(32 + 7, 8, 5), 1);
        assert_eq!(estimate_hops(32 + 15, 8, 5), 2);
        assert_eq!(estimate_hops(32 + 3, 8, 5), 0);
        assert_eq!(estimate_hops(32 + 4, 8, 5), 1);
    }

    #[test]
    fn test_hops_monotonic_in_trip_time() {
        for size in [0usize, 4, 8, 16, 24] {
            let mut last = 0;
            for trip in 0..2_000u32 {
                let hops = estimate_hops(trip, size, 5);
                assert!(hops >= last);
                last = hops;
            }
        }
    }

    #[test]
    fn test_monotonic_ms_from_us() {
        struct At(u64);
        impl Monotonic for At {
            fn now_us(&self) -> u64 {
                self.0
            }
        }
        assert_eq!(At(12_345_678).now_ms(), 12_345);
        assert_eq!((&At(999)).now_ms(), 0);
    }
}
