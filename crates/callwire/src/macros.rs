//! Macros for handler arities.

/// Counts identifiers, for array lengths in `impl_handler!`.
macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + crate::macros::count!($($tail)*) };
}

/// Generates `Handler` for closures of one arity.
/// Arguments: pairs of (type parameter, binding name), in declaration order.
macro_rules! impl_handler {
    ($($arg:ident $var:ident),*) => {
        impl<Func, Ret, $($arg,)*> crate::handler::Handler<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: Send + 'static,
            $($arg: Send + 'static,)*
        {
            fn params() -> Vec<callpack::TypeDesc> {
                vec![$(callpack::TypeDesc::of::<$arg>()),*]
            }

            fn result() -> Option<callpack::TypeDesc> {
                crate::handler::result_desc::<Ret>()
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn call(&self, args: Vec<callpack::Value>) -> crate::error::Result<Option<callpack::Value>> {
                const ARITY: usize = crate::macros::count!($($arg)*);
                let [$($var),*]: [callpack::Value; ARITY] = args
                    .try_into()
                    .map_err(|args: Vec<callpack::Value>| crate::error::Error::ArgumentCount {
                        expected: ARITY,
                        found: args.len(),
                    })?;

                let mut index = 0usize;
                $(
                    let $var = crate::handler::take::<$arg>(index, $var)?;
                    index += 1;
                )*

                Ok(crate::handler::wrap_result((self)($($var),*)))
            }
        }
    };
}

pub(crate) use count;
pub(crate) use impl_handler;
