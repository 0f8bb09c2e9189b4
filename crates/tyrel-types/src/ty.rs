//! The type AST.
//!
//! A [`Ty`] is a cheaply clonable handle to an immutable [`TyKind`] node.
//! Cloning shares the node; equality first checks for a shared node and
//! falls back to structural comparison.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dtype::DataType;
use crate::kind::Kind;
use crate::tensor::TensorType;

/// A type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ty(Arc<TyKind>);

/// The shapes a [`Ty`] can take.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TyKind {
    /// A tensor of known rank.
    Tensor(TensorType),
    /// A fixed-arity tuple.
    Tuple(TupleType),
    /// A mutable reference cell.
    Ref(RefType),
    /// Application of a type constructor to arguments.
    Call(TypeCall),
    /// An inference placeholder, resolved by the solver.
    Incomplete(IncompleteType),
    /// A function type.
    Func(FuncType),
    /// A bound type parameter.
    Var(TypeVar),
    /// A global type constructor name.
    GlobalVar(GlobalTypeVar),
}

/// A tuple type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleType {
    /// Field types in order.
    pub fields: Vec<Ty>,
}

/// A reference to a mutable cell holding `value`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefType {
    /// Type of the stored value.
    pub value: Ty,
}

/// Type-level application, e.g. `List[float32]`.
///
/// Arity is not checked here; that is the job of the relation that produced it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeCall {
    /// The applied constructor.
    pub func: Ty,
    /// Arguments in order.
    pub args: Vec<Ty>,
}

/// An inference variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncompleteType {
    /// Identifier, unique within a solver session.
    pub id: u32,
    /// Kind of type this placeholder stands for.
    pub kind: Kind,
}

/// A function type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FuncType {
    /// Parameter types.
    pub arg_types: Vec<Ty>,
    /// Result type.
    pub ret_type: Ty,
    /// Quantified type parameters.
    pub type_params: Vec<TypeVar>,
}

/// A rigid type parameter; it only unifies with itself.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeVar {
    /// Unique identifier.
    pub id: u32,
    /// Name used when printing.
    pub name: Arc<str>,
    /// Kind of the parameter.
    pub kind: Kind,
}

impl TypeVar {
    /// Creates a type parameter.
    #[must_use]
    pub fn new(id: u32, name: impl Into<Arc<str>>, kind: Kind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// The name of a global type constructor. Two are equal iff their names are.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalTypeVar {
    /// Global name.
    pub name: Arc<str>,
    /// Kind of the constructor.
    pub kind: Kind,
}

impl GlobalTypeVar {
    /// Creates a global type name.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl PartialEq for GlobalTypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for GlobalTypeVar {}

impl PartialOrd for GlobalTypeVar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GlobalTypeVar {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for GlobalTypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Ty {
    /// Wraps a node.
    #[must_use]
    pub fn new(kind: TyKind) -> Self {
        Self(Arc::new(kind))
    }

    /// The node behind this handle.
    #[must_use]
    pub fn kind(&self) -> &TyKind {
        &self.0
    }

    /// Returns true if both handles share one node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Ty) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A tensor type.
    #[must_use]
    pub fn tensor(tensor: TensorType) -> Self {
        Self::new(TyKind::Tensor(tensor))
    }

    /// A rank-0 tensor of `dtype`.
    #[must_use]
    pub fn scalar(dtype: DataType) -> Self {
        Self::tensor(TensorType::scalar(dtype))
    }

    /// A tuple type.
    #[must_use]
    pub fn tuple(fields: Vec<Ty>) -> Self {
        Self::new(TyKind::Tuple(TupleType { fields }))
    }

    /// The empty tuple.
    #[must_use]
    pub fn unit() -> Self {
        Self::tuple(Vec::new())
    }

    /// A reference type.
    #[must_use]
    pub fn reference(value: Ty) -> Self {
        Self::new(TyKind::Ref(RefType { value }))
    }

    /// A type-level application.
    #[must_use]
    pub fn call(func: Ty, args: Vec<Ty>) -> Self {
        Self::new(TyKind::Call(TypeCall { func, args }))
    }

    /// An inference placeholder.
    #[must_use]
    pub fn incomplete(id: u32, kind: Kind) -> Self {
        Self::new(TyKind::Incomplete(IncompleteType { id, kind }))
    }

    /// A function type.
    #[must_use]
    pub fn func(arg_types: Vec<Ty>, ret_type: Ty, type_params: Vec<TypeVar>) -> Self {
        Self::new(TyKind::Func(FuncType {
            arg_types,
            ret_type,
            type_params,
        }))
    }

    /// A type parameter.
    #[must_use]
    pub fn var(var: TypeVar) -> Self {
        Self::new(TyKind::Var(var))
    }

    /// A global type constructor.
    #[must_use]
    pub fn global(var: GlobalTypeVar) -> Self {
        Self::new(TyKind::GlobalVar(var))
    }

    /// Returns the tensor type if this is one.
    #[must_use]
    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self.kind() {
            TyKind::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the tuple type if this is one.
    #[must_use]
    pub fn as_tuple(&self) -> Option<&TupleType> {
        match self.kind() {
            TyKind::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the placeholder if this is one.
    #[must_use]
    pub fn as_incomplete(&self) -> Option<IncompleteType> {
        match self.kind() {
            TyKind::Incomplete(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true if this is a placeholder.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind(), TyKind::Incomplete(_))
    }

    /// The placeholders in this type, in order of first occurrence.
    #[must_use]
    pub fn incomplete_vars(&self) -> Vec<IncompleteType> {
        let mut vars = Vec::new();
        self.collect_incomplete(&mut vars);
        vars
    }

    fn collect_incomplete(&self, vars: &mut Vec<IncompleteType>) {
        match self.kind() {
            TyKind::Incomplete(v) => {
                if !vars.iter().any(|seen| seen.id == v.id) {
                    vars.push(*v);
                }
            }
            TyKind::Tensor(_) | TyKind::Var(_) | TyKind::GlobalVar(_) => {}
            TyKind::Tuple(t) => {
                for field in &t.fields {
                    field.collect_incomplete(vars);
                }
            }
            TyKind::Ref(r) => r.value.collect_incomplete(vars),
            TyKind::Call(c) => {
                c.func.collect_incomplete(vars);
                for arg in &c.args {
                    arg.collect_incomplete(vars);
                }
            }
            TyKind::Func(fun) => {
                for arg in &fun.arg_types {
                    arg.collect_incomplete(vars);
                }
                fun.ret_type.collect_incomplete(vars);
            }
        }
    }

    /// Returns true if no placeholder occurs in this type.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.kind() {
            TyKind::Incomplete(_) => false,
            TyKind::Tensor(_) | TyKind::Var(_) | TyKind::GlobalVar(_) => true,
            TyKind::Tuple(t) => t.fields.iter().all(Ty::is_complete),
            TyKind::Ref(r) => r.value.is_complete(),
            TyKind::Call(c) => c.func.is_complete() && c.args.iter().all(Ty::is_complete),
            TyKind::Func(fun) => {
                fun.arg_types.iter().all(Ty::is_complete) && fun.ret_type.is_complete()
            }
        }
    }

    /// Returns true if the placeholder `id` occurs in this type.
    #[must_use]
    pub fn mentions(&self, id: u32) -> bool {
        match self.kind() {
            TyKind::Incomplete(v) => v.id == id,
            TyKind::Tensor(_) | TyKind::Var(_) | TyKind::GlobalVar(_) => false,
            TyKind::Tuple(t) => t.fields.iter().any(|f| f.mentions(id)),
            TyKind::Ref(r) => r.value.mentions(id),
            TyKind::Call(c) => c.func.mentions(id) || c.args.iter().any(|a| a.mentions(id)),
            TyKind::Func(fun) => {
                fun.arg_types.iter().any(|a| a.mentions(id)) || fun.ret_type.mentions(id)
            }
        }
    }

    /// Replaces placeholders using `f`.
    ///
    /// Subtrees without a replacement are shared with `self`, not copied.
    #[must_use]
    pub fn replace_incomplete(&self, f: &mut dyn FnMut(IncompleteType) -> Option<Ty>) -> Ty {
        self.try_replace(f).unwrap_or_else(|| self.clone())
    }

    /// Returns `None` when nothing below `self` changed.
    fn try_replace(&self, f: &mut dyn FnMut(IncompleteType) -> Option<Ty>) -> Option<Ty> {
        match self.kind() {
            TyKind::Incomplete(v) => f(*v),
            TyKind::Tensor(_) | TyKind::Var(_) | TyKind::GlobalVar(_) => None,
            TyKind::Tuple(t) => replace_all(&t.fields, f).map(Ty::tuple),
            TyKind::Ref(r) => r.value.try_replace(f).map(Ty::reference),
            TyKind::Call(c) => {
                let func = c.func.try_replace(f);
                let args = replace_all(&c.args, f);
                if func.is_none() && args.is_none() {
                    return None;
                }
                Some(Ty::call(
                    func.unwrap_or_else(|| c.func.clone()),
                    args.unwrap_or_else(|| c.args.clone()),
                ))
            }
            TyKind::Func(fun) => {
                let args = replace_all(&fun.arg_types, f);
                let ret = fun.ret_type.try_replace(f);
                if args.is_none() && ret.is_none() {
                    return None;
                }
                Some(Ty::func(
                    args.unwrap_or_else(|| fun.arg_types.clone()),
                    ret.unwrap_or_else(|| fun.ret_type.clone()),
                    fun.type_params.clone(),
                ))
            }
        }
    }
}

fn replace_all(tys: &[Ty], f: &mut dyn FnMut(IncompleteType) -> Option<Ty>) -> Option<Vec<Ty>> {
    let replaced: Vec<Option<Ty>> = tys.iter().map(|t| t.try_replace(f)).collect();
    if replaced.iter().all(Option::is_none) {
        return None;
    }
    Some(
        replaced
            .into_iter()
            .zip(tys)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect(),
    )
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Ty {}

impl PartialOrd for Ty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ty {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        self.0.cmp(&other.0)
    }
}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<TensorType> for Ty {
    fn from(tensor: TensorType) -> Self {
        Self::tensor(tensor)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TyKind::Tensor(t) => write!(f, "{t}"),
            TyKind::Tuple(t) => {
                write!(f, "(")?;
                write_list(f, &t.fields)?;
                if t.fields.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            TyKind::Ref(r) => write!(f, "ref({})", r.value),
            TyKind::Call(c) => {
                write!(f, "{}[", c.func)?;
                write_list(f, &c.args)?;
                write!(f, "]")
            }
            TyKind::Incomplete(v) => write!(f, "?{}", v.id),
            TyKind::Func(fun) => {
                write!(f, "fn")?;
                if !fun.type_params.is_empty() {
                    write!(f, "<")?;
                    for (i, p) in fun.type_params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", p.name)?;
                    }
                    write!(f, ">")?;
                }
                write!(f, "(")?;
                write_list(f, &fun.arg_types)?;
                write!(f, ") -> {}", fun.ret_type)
            }
            TyKind::Var(v) => write!(f, "{}", v.name),
            TyKind::GlobalVar(g) => write!(f, "{}", g.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_tensor(dims: &[i64]) -> Ty {
        Ty::tensor(TensorType::from_dims(dims, DataType::FLOAT32))
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(f32_tensor(&[2, 3]), f32_tensor(&[2, 3]));
        assert_ne!(f32_tensor(&[2, 3]), f32_tensor(&[3, 2]));
        let t = f32_tensor(&[1]);
        assert!(t.ptr_eq(&t.clone()));
    }

    #[test]
    fn test_incomplete_vars_first_occurrence() {
        let a = Ty::incomplete(3, Kind::Type);
        let b = Ty::incomplete(1, Kind::Type);
        let t = Ty::tuple(vec![a.clone(), Ty::reference(b), a]);
        let ids: Vec<u32> = t.incomplete_vars().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(!t.is_complete());
        assert!(t.mentions(1));
        assert!(!t.mentions(2));
    }

    #[test]
    fn test_replace_incomplete_shares_untouched() {
        let field = f32_tensor(&[4]);
        let t = Ty::tuple(vec![field.clone(), Ty::incomplete(0, Kind::Type)]);
        let r = t.replace_incomplete(&mut |v: IncompleteType| (v.id == 0).then(|| Ty::scalar(DataType::INT32)));
        assert!(r.is_complete());
        let fields = &r.as_tuple().unwrap().fields;
        assert!(fields[0].ptr_eq(&field));
        assert_eq!(fields[1], Ty::scalar(DataType::INT32));

        let same = field.replace_incomplete(&mut |_: IncompleteType| None);
        assert!(same.ptr_eq(&field));
    }

    #[test]
    fn test_global_var_equality_by_name() {
        let a = GlobalTypeVar::new("List", Kind::AdtHandle);
        let b = GlobalTypeVar::new("List", Kind::Type);
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ty::unit().to_string(), "()");
        let list = Ty::global(GlobalTypeVar::new("List", Kind::AdtHandle));
        let call = Ty::call(list, vec![Ty::scalar(DataType::FLOAT32)]);
        assert_eq!(call.to_string(), "List[Tensor[(), float32]]");
        let t = Ty::tuple(vec![Ty::incomplete(7, Kind::Type)]);
        assert_eq!(t.to_string(), "(?7,)");
        let p = TypeVar::new(0, "T", Kind::Type);
        let fun = Ty::func(vec![Ty::var(p.clone())], Ty::reference(Ty::var(p.clone())), vec![p]);
        assert_eq!(fun.to_string(), "fn<T>(T) -> ref(T)");
    }
}
