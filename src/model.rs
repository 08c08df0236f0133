//! Models, their recycling pool and the ledger of models found for a
//! component.

use crate::{
    datastructure::VarVec,
    literal::{Lit, LitSlice, Var},
};
use std::rc::Rc;
use tracing::trace;

/// A (partial) assignment captured from the trail.
///
/// Cloning shares the underlying buffer, [`Model::assign`] copies it first
/// if it is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    values: Rc<VarVec<Option<bool>>>,
}

impl Model {
    pub fn var_count(&self) -> usize {
        self.values.var_count()
    }

    pub fn value(&self, var: Var) -> Option<bool> {
        self.values.get(var).copied().flatten()
    }

    /// Returns `true` if `lit` is assigned true.
    pub fn satisfies(&self, lit: Lit) -> bool {
        self.value(lit.var()) == Some(lit.is_positive())
    }

    pub fn assign(&mut self, lit: Lit) {
        let values = Rc::make_mut(&mut self.values);
        if values.var_count() <= lit.var().index() {
            values.set_var_count(lit.var().index() + 1);
        }
        values[lit.var()] = Some(lit.is_positive());
    }

    /// The true literals of the model.
    pub fn lits(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values.iter().filter_map(|(var, value)| value.map(|value| var.lit(value)))
    }

    fn is_shared(&self) -> bool {
        Rc::strong_count(&self.values) > 1
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lits: Vec<Lit> = self.lits().collect();
        write!(f, "{}", LitSlice::from(lits.as_slice()))
    }
}

/// Recycles model buffers.
#[derive(Debug, Default)]
pub struct ModelPool {
    free: Vec<VarVec<Option<bool>>>,
    allocated: usize,
    recycled: usize,
}

impl ModelPool {
    /// A model without any assigned variable.
    pub fn allocate(&mut self, var_count: usize) -> Model {
        self.allocated += 1;
        let values = match self.free.pop() {
            Some(mut values) => {
                self.recycled += 1;
                values.fill(None);
                values.set_var_count(var_count);
                values
            }
            None => VarVec::with_var_count(var_count),
        };
        Model { values: Rc::new(values) }
    }

    /// Another owner of the same model.
    #[allow(clippy::unused_self)]
    pub fn copy(&self, model: &Model) -> Model {
        model.clone()
    }

    /// Gives up ownership of `model`, the buffer is recycled if this was the
    /// last owner.
    pub fn free(&mut self, model: Model) {
        if let Ok(values) = Rc::try_unwrap(model.values) {
            self.free.push(values);
        }
    }

    /// Number of models handed out and how many of them reused a buffer.
    pub fn usage(&self) -> (usize, usize) {
        (self.allocated, self.recycled)
    }
}

/// The models known for a component.
///
/// Used to rule out backbone candidates: a literal that is false in some
/// model is not implied.
#[derive(Debug, Default)]
pub struct ModelLedger {
    models: Vec<Model>,
}

impl ModelLedger {
    pub fn add(&mut self, model: Model) {
        trace!("ledger model {}: {model}", self.models.len());
        self.models.push(model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// The value every model agrees on, `None` if there is no model, some
    /// model leaves `var` unassigned, or two models disagree.
    pub fn unanimous(&self, var: Var) -> Option<bool> {
        let (first, rest) = self.models.split_first()?;
        let value = first.value(var)?;
        rest.iter().all(|model| model.value(var) == Some(value)).then_some(value)
    }

    /// The literals over `vars` that are true in every model.
    pub fn candidates(&self, vars: &[Var]) -> Vec<Lit> {
        vars.iter().filter_map(|&var| self.unanimous(var).map(|value| var.lit(value))).collect()
    }

    /// Assigns `lit` in every model, e.g. after it was decided above the
    /// component.
    pub fn extend(&mut self, lit: Lit) {
        for model in &mut self.models {
            if model.is_shared() {
                trace!("copy shared model to assign {lit}");
            }
            model.assign(lit);
        }
    }

    /// Adds every model of this ledger to `other` as well.
    pub fn share_into(&self, other: &mut ModelLedger, pool: &ModelPool) {
        other.models.extend(self.models.iter().map(|model| pool.copy(model)));
    }

    /// Moves every model of `other` into this ledger.
    pub fn take_from(&mut self, other: &mut ModelLedger) {
        self.models.append(&mut other.models);
    }

    /// Returns every model to the pool.
    pub fn release(&mut self, pool: &mut ModelPool) {
        for model in self.models.drain(..) {
            pool.free(model);
        }
    }
}
