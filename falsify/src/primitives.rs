//! Default `Arbitrary` instances for primitive and standard library types.

use crate::arbitrary::Arbitrary;
use crate::generator::Gen;
use crate::shrink::strategies;

macro_rules! impl_signed_arbitrary {
    ($($t:ty),*) => {
        $(
            impl Arbitrary for $t {
                fn arbitrary() -> Gen<Self> {
                    Gen::new(|source, size| {
                        let bound = <$t>::try_from(size).unwrap_or(<$t>::MAX);
                        source.bounded(-bound, bound).0
                    })
                }

                fn shrink(&self) -> Vec<Self> {
                    strategies::signed_int_shrink(self)
                }
            }
        )*
    };
}

macro_rules! impl_unsigned_arbitrary {
    ($($t:ty),*) => {
        $(
            impl Arbitrary for $t {
                fn arbitrary() -> Gen<Self> {
                    Gen::new(|source, size| {
                        let bound = <$t>::try_from(size).unwrap_or(<$t>::MAX);
                        source.bounded(0, bound).0
                    })
                }

                fn shrink(&self) -> Vec<Self> {
                    strategies::unsigned_int_shrink(self)
                }
            }
        )*
    };
}

impl_signed_arbitrary!(i8, i16, i32, i64, i128, isize);
impl_unsigned_arbitrary!(u8, u16, u32, u64, u128, usize);

macro_rules! impl_float_arbitrary {
    ($($t:ty),*) => {
        $(
            impl Arbitrary for $t {
                /// Whole part bounded by the size, plus a uniform fraction
                fn arbitrary() -> Gen<Self> {
                    Gen::new(|source, size| {
                        let bound = size as $t;
                        let (whole, rest) = source.bounded(-bound, bound);
                        let (fraction, _) = rest.bounded(0.0, 1.0);
                        (whole.trunc() + fraction).clamp(-bound.max(1.0), bound.max(1.0))
                    })
                }

                fn shrink(&self) -> Vec<Self> {
                    strategies::float_shrink(self)
                }
            }
        )*
    };
}

impl_float_arbitrary!(f32, f64);

impl Arbitrary for bool {
    fn arbitrary() -> Gen<Self> {
        Gen::new(|source, _| source.bounded(0u8, 1).0 == 1)
    }

    fn shrink(&self) -> Vec<Self> {
        strategies::bool_shrink(self)
    }
}

impl Arbitrary for char {
    /// Mostly printable ASCII, occasionally from the rest of the basic plane
    fn arbitrary() -> Gen<Self> {
        Gen::new(|source, _| {
            let (roll, rest) = source.bounded(0u8, 9);
            let code = if roll == 0 {
                rest.bounded(0xA1u32, 0xD7FF).0
            } else {
                rest.bounded(0x20u32, 0x7E).0
            };
            char::from_u32(code).unwrap_or(' ')
        })
    }

    fn shrink(&self) -> Vec<Self> {
        strategies::char_shrink(self)
    }
}

impl Arbitrary for String {
    fn arbitrary() -> Gen<Self> {
        char::arbitrary()
            .vec_of()
            .map(|chars| chars.into_iter().collect())
    }

    fn shrink(&self) -> Vec<Self> {
        strategies::string_shrink(self)
    }
}

impl<T: Arbitrary> Arbitrary for Vec<T> {
    fn arbitrary() -> Gen<Self> {
        T::arbitrary().vec_of()
    }

    fn shrink(&self) -> Vec<Self> {
        strategies::collection_shrink(self, T::shrink)
    }
}

impl<T: Arbitrary> Arbitrary for Option<T> {
    /// `None` a quarter of the time
    fn arbitrary() -> Gen<Self> {
        let inner = T::arbitrary();
        Gen::new(move |source, size| {
            let (pick, rest) = source.split();
            match pick.bounded(0u8, 3).0 {
                0 => None,
                _ => Some(inner.generate(rest, size)),
            }
        })
    }

    fn shrink(&self) -> Vec<Self> {
        match self {
            None => Vec::new(),
            Some(value) => std::iter::once(None)
                .chain(value.shrink().into_iter().map(Some))
                .collect(),
        }
    }
}

impl Arbitrary for () {
    fn arbitrary() -> Gen<Self> {
        Gen::constant(())
    }
}

macro_rules! impl_tuple_arbitrary {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Arbitrary),+> Arbitrary for ($($name,)+) {
            fn arbitrary() -> Gen<Self> {
                let generators = ($($name::arbitrary(),)+);
                Gen::compose(move |c| ($(c.generate(&generators.$idx),)+))
            }

            fn shrink(&self) -> Vec<Self> {
                let mut candidates = Vec::new();
                $(
                    for smaller in self.$idx.shrink() {
                        let mut next = self.clone();
                        next.$idx = smaller;
                        candidates.push(next);
                    }
                )+
                candidates
            }
        }
    };
}

impl_tuple_arbitrary!(A: 0, B: 1);
impl_tuple_arbitrary!(A: 0, B: 1, C: 2);
impl_tuple_arbitrary!(A: 0, B: 1, C: 2, D: 3);
