//! Multi-driver resolution.

use crate::logic::Logic;
use crate::logic_vec::LogicVec;

/// Combines the values of several drivers of one signal into the value the
/// signal takes.
///
/// Implementations must be associative and commutative: the kernel folds the
/// drivers of a delta cycle in no particular order.
pub trait Resolve: Sized {
    /// Resolves two driver values into one.
    fn resolve(&self, other: &Self) -> Self;
}

impl Resolve for Logic {
    fn resolve(&self, other: &Self) -> Self {
        Logic::resolve(*self, *other)
    }
}

impl Resolve for LogicVec {
    fn resolve(&self, other: &Self) -> Self {
        LogicVec::resolve(self, other)
    }
}

/// Folds all driver values with [`Resolve::resolve`]. `None` when there are no drivers.
pub fn resolve_all<'a, T, I>(values: I) -> Option<T>
where
    T: Resolve + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut iter = values.into_iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, v| acc.resolve(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_driver_set() {
        assert_eq!(resolve_all::<Logic, _>(&[]), None);
    }

    const ALL: [Logic; 4] = [Logic::Zero, Logic::One, Logic::X, Logic::Z];

    /// Every ordering of `items`.
    fn orderings<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in orderings(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn fold_order_does_not_matter() {
        assert_eq!(orderings(&ALL).len(), 24);
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    let drivers = [a, b, c, Logic::Z];
                    let expected = resolve_all(drivers.iter()).unwrap();
                    for order in orderings(&drivers) {
                        assert_eq!(resolve_all(order.iter()).unwrap(), expected, "{order:?}");
                    }
                }
            }
        }
        assert_eq!(resolve_all([Logic::Z, Logic::One, Logic::Z].iter()), Some(Logic::One));
    }

    #[test]
    fn conflicting_vectors() {
        let a = LogicVec::from_u64(0b01, 2);
        let b = LogicVec::from_u64(0b11, 2);
        assert_eq!(resolve_all([&a, &b]).unwrap().to_string(), "X1");
    }
}
