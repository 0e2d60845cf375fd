//! Filter and sort translation into in-process closures.

use std::cmp::Ordering;

use crate::error::FilterError;
use crate::schema::{Entity, EntitySchema, FieldAccessor, FieldValue};
use crate::types::{FieldRef, FilterVisitor, Predicate, SortDirection, SortRule};

/// A filter compiled into a closure over entities.
pub type MemoryPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Compiles a filter against one entity type's schema.
pub struct MemoryTranslator<'s, E: Entity> {
    schema: &'s EntitySchema<E>,
}

impl<'s, E: Entity> MemoryTranslator<'s, E> {
    /// Creates a translator for `schema`.
    pub fn new(schema: &'s EntitySchema<E>) -> Self {
        Self { schema }
    }
}

impl<E: Entity> FilterVisitor for MemoryTranslator<'_, E> {
    type Output = MemoryPredicate<E>;
    type Error = FilterError;

    fn visit_empty(&self) -> Result<MemoryPredicate<E>, FilterError> {
        Ok(Box::new(|_: &E| true))
    }

    fn visit_where(
        &self,
        field: &FieldRef,
        predicate: &Predicate,
    ) -> Result<MemoryPredicate<E>, FilterError> {
        let accessor = self.schema.resolve(field)?;
        let predicate = predicate.clone();
        Ok(Box::new(move |entity: &E| {
            let value = accessor.read(entity).unwrap_or(FieldValue::Null);
            predicate.matches(&value)
        }))
    }

    fn visit_and(
        &self,
        children: Vec<MemoryPredicate<E>>,
    ) -> Result<MemoryPredicate<E>, FilterError> {
        Ok(Box::new(move |entity: &E| {
            children.iter().all(|child| child(entity))
        }))
    }

    fn visit_or(
        &self,
        children: Vec<MemoryPredicate<E>>,
    ) -> Result<MemoryPredicate<E>, FilterError> {
        Ok(Box::new(move |entity: &E| {
            children.iter().any(|child| child(entity))
        }))
    }

    fn visit_not(&self, inner: MemoryPredicate<E>) -> Result<MemoryPredicate<E>, FilterError> {
        Ok(Box::new(move |entity: &E| !inner(entity)))
    }
}

/// Sort rules resolved to accessors.
///
/// An empty plan leaves items in their incoming (key) order. Sorting is
/// stable, so ties also keep key order.
#[derive(Debug, Clone, Default)]
pub struct SortPlan {
    keys: Vec<(FieldAccessor, SortDirection)>,
}

impl SortPlan {
    /// Resolves `rules` against `schema`.
    pub fn resolve<E: Entity>(
        schema: &EntitySchema<E>,
        rules: &[SortRule],
    ) -> Result<Self, FilterError> {
        let keys = rules
            .iter()
            .map(|rule| Ok((schema.resolve(&rule.field)?, rule.direction)))
            .collect::<Result<Vec<_>, FilterError>>()?;
        Ok(Self { keys })
    }

    /// Returns true if the plan has no sort keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compares two entities by the plan's keys in order.
    pub fn compare<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        for (accessor, direction) in &self.keys {
            let left = accessor.read(a).unwrap_or(FieldValue::Null);
            let right = accessor.read(b).unwrap_or(FieldValue::Null);
            let ordering = direction.apply(left.sort_cmp(&right));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sorts `items` in place.
    pub fn apply<E: Entity>(&self, items: &mut [&E]) {
        if !self.is_empty() {
            items.sort_by(|a, b| self.compare(*a, *b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchemaBuilder, schema_of};
    use crate::types::Filter;

    #[derive(Debug, Clone, PartialEq)]
    struct Planet {
        name: Option<String>,
        moons: i64,
        ringed: bool,
    }

    impl Entity for Planet {
        type Key = String;

        fn describe(schema: &mut EntitySchemaBuilder<Self>) {
            schema
                .key("name", |p| p.name.clone(), |p, n| p.name = Some(n))
                .field("moons", |p| FieldValue::from(p.moons))
                .field("ringed", |p| FieldValue::from(p.ringed));
        }
    }

    fn planet(name: &str, moons: i64, ringed: bool) -> Planet {
        Planet {
            name: Some(name.to_string()),
            moons,
            ringed,
        }
    }

    fn compile(filter: &Filter) -> Result<MemoryPredicate<Planet>, FilterError> {
        let schema = schema_of::<Planet>();
        filter.accept(&MemoryTranslator::<Planet>::new(&schema))
    }

    #[test]
    fn test_compiled_filter() {
        let predicate = compile(
            &Filter::gt("moons", 10).and(Filter::eq("ringed", true).negate()),
        )
        .unwrap();
        assert!(!predicate(&planet("saturn", 146, true)));
        assert!(predicate(&planet("jupiter", 95, false)));
        assert!(!predicate(&planet("earth", 1, false)));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let predicate = compile(&Filter::empty()).unwrap();
        assert!(predicate(&planet("mercury", 0, false)));
    }

    #[test]
    fn test_unmapped_field_fails_at_translation() {
        let err = compile(&Filter::eq("mass", 5)).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_sort_plan_multi_key() {
        let schema = schema_of::<Planet>();
        let plan = SortPlan::resolve::<Planet>(
            &schema,
            &[SortRule::desc("ringed"), SortRule::asc("moons")],
        )
        .unwrap();

        let planets = [
            planet("earth", 1, false),
            planet("uranus", 28, true),
            planet("mars", 2, false),
            planet("saturn", 146, true),
        ];
        let mut refs: Vec<&Planet> = planets.iter().collect();
        plan.apply(&mut refs);
        let names: Vec<_> = refs.iter().filter_map(|p| p.name.as_deref()).collect();
        assert_eq!(names, vec!["uranus", "saturn", "earth", "mars"]);
    }
}
