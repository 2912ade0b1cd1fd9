use crate::float::{cast, from_usize, Float};

pub enum PeakCorrection {
    Quadratic,
    None,
}

struct Point<T: Float> {
    x: T,
    y: T,
}

fn detect_crossings<T: Float>(arr: &[T]) -> impl Iterator<Item = (usize, usize)> + '_ {
    arr.windows(2)
        .enumerate()
        .scan(
            None,
            |positive_zero_cross: &mut Option<usize>, (i, win)| match positive_zero_cross.take() {
                Some(idx) => {
                    if win[1] < T::zero() && win[0] > T::zero() {
                        *positive_zero_cross = None;
                        Some(Some((idx, i + 1)))
                    } else {
                        *positive_zero_cross = Some(idx);
                        Some(None)
                    }
                }
                None => {
                    if win[1] > T::zero() && win[0] < T::zero() {
                        *positive_zero_cross = Some(i + 1);
                    }
                    Some(None)
                }
            },
        )
        .flatten()
}

/// Find the maximum of every region where `arr` rises above zero and falls back below it.
pub fn detect_peaks<T: Float>(arr: &[T]) -> impl Iterator<Item = (usize, T)> + '_ {
    detect_crossings(arr).map(move |(start, stop)| {
        let mut peak_idx = 0;
        let mut peak_val = -T::infinity();
        for (i, &v) in arr.iter().enumerate().take(stop).skip(start) {
            if v > peak_val {
                peak_val = v;
                peak_idx = i;
            }
        }
        (peak_idx, peak_val)
    })
}

/// Refine the position and height of the sample at `peak.0`. Quadratic correction
/// needs a neighbour on both sides; at the edges the peak is returned as is.
pub fn correct_peak<T: Float>(peak: (usize, T), data: &[T], correction: PeakCorrection) -> (T, T) {
    let idx = peak.0;
    match correction {
        PeakCorrection::Quadratic if idx > 0 && idx + 1 < data.len() => {
            let point = quadratic_interpolation(
                Point {
                    x: from_usize(idx - 1),
                    y: data[idx - 1],
                },
                Point {
                    x: from_usize(idx),
                    y: data[idx],
                },
                Point {
                    x: from_usize(idx + 1),
                    y: data[idx + 1],
                },
            );
            (point.x, point.y)
        }
        _ => (from_usize(idx), peak.1),
    }
}

/// Vertex offset of the parabola through three equally spaced samples, relative to
/// the centre one. Zero when the samples are collinear.
pub fn parabolic_shift<T: Float>(left: T, center: T, right: T) -> T {
    let denominator = cast::<T>(2.0) * center - left - right;
    if denominator == T::zero() {
        return T::zero();
    }
    cast::<T>(0.5) * (right - left) / denominator
}

fn quadratic_interpolation<T: Float>(
    left: Point<T>,
    center: Point<T>,
    right: Point<T>,
) -> Point<T> {
    let shift = parabolic_shift(left.y, center.y, right.y);
    let x = center.x + shift;
    let y = center.y + cast::<T>(0.25) * (right.y - left.y) * shift;
    Point { x, y }
}
