//! # Handlers
//!
//! A registered function is stored as a `FunctionEntry`: its name, the
//! `TypeDesc` of each parameter in declaration order, the `TypeDesc` of its
//! result, and a type-erased callable taking decoded `Value`s.
//!
//! Plain closures and `fn` items of up to eight arguments become entries
//! through the `Handler` trait. A handler returning `()` declares no result
//! and is answered with an acknowledgement instead of a value.

use std::any::Any;
use std::any::TypeId;
use std::sync::Arc;

use callpack::TypeDesc;
use callpack::Value;

use crate::error::Error;
use crate::error::Result;
use crate::macros::impl_handler;

/// The type-erased form every handler is called through.
pub type HandlerFn = dyn Fn(Vec<Value>) -> Result<Option<Value>> + Send + Sync;

/// A native callable with a fixed parameter list.
///
/// `Args` is the tuple of parameter types; it only exists so one closure type
/// can be matched against each arity.
pub trait Handler<Args>: Send + Sync + 'static {
    fn params() -> Vec<TypeDesc>;

    /// `None` when the handler returns `()`.
    fn result() -> Option<TypeDesc>;

    /// Calls the handler with decoded arguments, in declaration order.
    fn call(&self, args: Vec<Value>) -> Result<Option<Value>>;
}

impl_handler!();
impl_handler!(A a);
impl_handler!(A a, B b);
impl_handler!(A a, B b, C c);
impl_handler!(A a, B b, C c, D d);
impl_handler!(A a, B b, C c, D d, E e);
impl_handler!(A a, B b, C c, D d, E e, F f);
impl_handler!(A a, B b, C c, D d, E e, F f, G g);
impl_handler!(A a, B b, C c, D d, E e, F f, G g, H h);

pub(crate) fn result_desc<Ret: 'static>() -> Option<TypeDesc> {
    if TypeId::of::<Ret>() == TypeId::of::<()>() {
        None
    } else {
        Some(TypeDesc::of::<Ret>())
    }
}

pub(crate) fn wrap_result<Ret: Send + 'static>(ret: Ret) -> Option<Value> {
    result_desc::<Ret>().map(|_| Box::new(ret) as Value)
}

pub(crate) fn take<T: 'static>(index: usize, value: Value) -> Result<T> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| Error::ArgumentType {
            index,
            expected: std::any::type_name::<T>(),
        })
}

/// One registered function.
#[derive(Clone)]
pub struct FunctionEntry {
    name: String,
    result: Option<TypeDesc>,
    handler: Arc<HandlerFn>,
    params: Vec<TypeDesc>,
}

impl FunctionEntry {
    /// Builds an entry from a typed handler, deriving its signature.
    pub fn new<Args, H>(name: impl Into<String>, handler: H) -> Self
    where
        Args: 'static,
        H: Handler<Args>,
    {
        Self {
            name: name.into(),
            result: <H as Handler<Args>>::result(),
            handler: Arc::new(move |args| handler.call(args)),
            params: <H as Handler<Args>>::params(),
        }
    }

    /// Builds an entry from an explicit signature and an erased callable.
    ///
    /// `handler` receives exactly `params.len()` values, one per descriptor,
    /// and must return a value of type `result` (or `None` if there is none).
    pub fn from_parts(
        name: impl Into<String>,
        result: Option<TypeDesc>,
        handler: Arc<HandlerFn>,
        params: Vec<TypeDesc>,
    ) -> Self {
        Self {
            name: name.into(),
            result,
            handler,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> Option<TypeDesc> {
        self.result
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    /// Calls the handler, checking the argument count and the result type
    /// against the declared signature.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Option<Value>> {
        if args.len() != self.params.len() {
            return Err(Error::ArgumentCount {
                expected: self.params.len(),
                found: args.len(),
            });
        }

        let ret = (self.handler)(args)?;
        match (self.result, ret) {
            (None, _) => Ok(None),
            (Some(desc), Some(value)) if (*value).type_id() == desc.id() => Ok(Some(value)),
            (Some(desc), _) => Err(Error::ResultType { expected: desc.name() }),
        }
    }
}

impl std::fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("result", &self.result.map(|d| d.name()))
            .field("params", &self.params.iter().map(|d| d.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_from_closure() {
        let entry = FunctionEntry::new("Add", |a: i32, b: i32| a + b);
        assert_eq!(entry.params(), &[TypeDesc::of::<i32>(), TypeDesc::of::<i32>()]);
        assert_eq!(entry.result(), Some(TypeDesc::of::<i32>()));
    }

    #[test]
    fn test_unit_return_has_no_result() {
        let entry = FunctionEntry::new("Nothing", || {});
        assert!(entry.params().is_empty());
        assert_eq!(entry.result(), None);
        assert!(entry.invoke(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_invoke_checks_arguments() {
        let entry = FunctionEntry::new("Neg", |a: i64| -a);

        let err = entry.invoke(Vec::new()).unwrap_err();
        assert_eq!(err, Error::ArgumentCount { expected: 1, found: 0 });

        let err = entry.invoke(vec![Box::new(1i32) as Value]).unwrap_err();
        assert!(matches!(err, Error::ArgumentType { index: 0, .. }));

        let ret = entry.invoke(vec![Box::new(5i64) as Value]).unwrap().unwrap();
        assert_eq!(*ret.downcast::<i64>().unwrap(), -5);
    }

    #[test]
    fn test_from_parts_result_is_checked() {
        let lying: Arc<HandlerFn> = Arc::new(|_: Vec<Value>| Ok(Some(Box::new(1u8) as Value)));
        let entry = FunctionEntry::from_parts("Lie", Some(TypeDesc::of::<i32>()), lying, Vec::new());
        assert!(matches!(entry.invoke(Vec::new()), Err(Error::ResultType { .. })));
    }
}
