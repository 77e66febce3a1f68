//! Per-user facade over the cache and coordinator.
//!
//! Screens talk to a [`Session`]: typed queries return [`QueryHandle`]s, typed
//! mutations run through the [`MutationCoordinator`] with the invalidation
//! set each write needs. Derived stats roll up the hierarchy (a new student
//! changes its grade's `student_count` and its school's `total_students`), so
//! writes also invalidate the ancestors whose numbers move.

use std::sync::Arc;

use campus_core::{
  CampusStore, Entity, ListParams, Repository, Result,
  breadcrumb::{self, Crumb, Loaded},
  entity::Draft,
  grade::{Grade, GradePatch, NewGrade},
  id::{GradeId, PaymentId, SchoolId, StudentId, UserId},
  payment::{NewPayment, Payment, PaymentPatch},
  route::Route,
  school::{NewSchool, School, SchoolPatch},
  student::{NewStudent, Student, StudentPatch},
};

use crate::{
  cache::{QueryCache, QueryHandle, QueryOptions},
  config::CacheConfig,
  key::{KeyPattern, QueryKey},
  mutation::{MutationCoordinator, MutationKey},
};

pub struct Session<S> {
  user:      UserId,
  store:     Arc<S>,
  cache:     QueryCache,
  mutations: MutationCoordinator,
}

impl<S: CampusStore + 'static> Session<S> {
  pub fn new(user: UserId, store: Arc<S>, config: &CacheConfig) -> Self {
    let cache = QueryCache::new(config);
    let mutations = MutationCoordinator::new(cache.clone(), config.event_capacity);
    tracing::debug!(user = %user, "session started");
    Self { user, store, cache, mutations }
  }

  pub fn user(&self) -> &UserId { &self.user }

  pub fn cache(&self) -> &QueryCache { &self.cache }

  pub fn mutations(&self) -> &MutationCoordinator { &self.mutations }

  /// Drop every cached entry. In-flight fetches finish but are discarded.
  pub fn logout(self) {
    tracing::info!(user = %self.user, entries = self.cache.len(), "logging out");
    self.cache.clear();
  }

  // ─── Queries ───────────────────────────────────────────────────────────────

  pub fn entity<E: Entity>(&self, id: E::Id) -> QueryHandle<E>
  where
    S: Repository<E>,
  {
    let store = Arc::clone(&self.store);
    self.cache.get(
      QueryKey::one::<E>(&id),
      move || async move { Repository::<E>::fetch_by_id(&*store, id).await },
      QueryOptions::default(),
    )
  }

  pub fn list<E: Entity>(
    &self,
    parent: E::Parent,
    params: ListParams,
  ) -> QueryHandle<Vec<E>>
  where
    S: Repository<E>,
  {
    let store = Arc::clone(&self.store);
    let key = QueryKey::list::<E>(&parent, params.clone());
    self.cache.get(
      key,
      move || async move {
        Repository::<E>::fetch_by_parent(&*store, parent, params).await
      },
      QueryOptions::default(),
    )
  }

  /// The signed-in user's schools.
  pub fn schools(&self, params: ListParams) -> QueryHandle<Vec<School>> {
    self.list::<School>(self.user.clone(), params)
  }

  pub fn school(&self, id: SchoolId) -> QueryHandle<School> { self.entity::<School>(id) }

  pub fn grades(
    &self,
    school: SchoolId,
    params: ListParams,
  ) -> QueryHandle<Vec<Grade>> {
    self.list::<Grade>(school, params)
  }

  pub fn grade(&self, id: GradeId) -> QueryHandle<Grade> { self.entity::<Grade>(id) }

  pub fn students(
    &self,
    grade: GradeId,
    params: ListParams,
  ) -> QueryHandle<Vec<Student>> {
    self.list::<Student>(grade, params)
  }

  pub fn student(&self, id: StudentId) -> QueryHandle<Student> {
    self.entity::<Student>(id)
  }

  pub fn payments(
    &self,
    student: StudentId,
    params: ListParams,
  ) -> QueryHandle<Vec<Payment>> {
    self.list::<Payment>(student, params)
  }

  pub fn payment(&self, id: PaymentId) -> QueryHandle<Payment> {
    self.entity::<Payment>(id)
  }

  // ─── Mutations ─────────────────────────────────────────────────────────────

  async fn create<E: Entity>(
    &self,
    draft: E::Draft,
    invalidate: Vec<KeyPattern>,
  ) -> Result<E>
  where
    S: Repository<E>,
  {
    let key = MutationKey::create::<E>(&draft);
    let store = &*self.store;
    self
      .mutations
      .run(key, move || Repository::<E>::create(store, draft), invalidate)
      .await
  }

  async fn update<E: Entity>(
    &self,
    id: E::Id,
    patch: E::Patch,
    invalidate: Vec<KeyPattern>,
  ) -> Result<E>
  where
    S: Repository<E>,
  {
    let key = MutationKey::update::<E>(&id);
    let store = &*self.store;
    self
      .mutations
      .run(key, move || Repository::<E>::update(store, id, patch), invalidate)
      .await
  }

  async fn delete<E: Entity>(
    &self,
    id: E::Id,
    invalidate: Vec<KeyPattern>,
  ) -> Result<()>
  where
    S: Repository<E>,
  {
    let key = MutationKey::delete::<E>(&id);
    let store = &*self.store;
    self
      .mutations
      .run(key, move || Repository::<E>::delete(store, id), invalidate)
      .await
  }

  pub async fn create_school(&self, draft: NewSchool) -> Result<School> {
    let invalidate = vec![KeyPattern::lists_under::<School>(draft.parent_id())];
    self.create::<School>(draft, invalidate).await
  }

  pub async fn update_school(
    &self,
    id: SchoolId,
    patch: SchoolPatch,
  ) -> Result<School> {
    let invalidate =
      vec![KeyPattern::one::<School>(&id), KeyPattern::lists::<School>()];
    self.update::<School>(id, patch, invalidate).await
  }

  /// Children go with the school, so every cached child entry is dropped
  /// from freshness.
  pub async fn delete_school(&self, id: SchoolId) -> Result<()> {
    let invalidate = vec![
      KeyPattern::one::<School>(&id),
      KeyPattern::lists::<School>(),
      KeyPattern::kind::<Grade>(),
      KeyPattern::kind::<Student>(),
      KeyPattern::kind::<Payment>(),
    ];
    self.delete::<School>(id, invalidate).await
  }

  pub async fn create_grade(&self, draft: NewGrade) -> Result<Grade> {
    let invalidate = vec![
      KeyPattern::lists_under::<Grade>(&draft.school_id),
      KeyPattern::one::<School>(&draft.school_id),
      KeyPattern::lists::<School>(),
    ];
    self.create::<Grade>(draft, invalidate).await
  }

  pub async fn update_grade(
    &self,
    id: GradeId,
    patch: GradePatch,
  ) -> Result<Grade> {
    let invalidate =
      vec![KeyPattern::one::<Grade>(&id), KeyPattern::lists::<Grade>()];
    self.update::<Grade>(id, patch, invalidate).await
  }

  pub async fn delete_grade(&self, id: GradeId) -> Result<()> {
    let invalidate = vec![
      KeyPattern::one::<Grade>(&id),
      KeyPattern::lists::<Grade>(),
      KeyPattern::kind::<Student>(),
      KeyPattern::kind::<Payment>(),
      KeyPattern::kind::<School>(),
    ];
    self.delete::<Grade>(id, invalidate).await
  }

  pub async fn create_student(&self, draft: NewStudent) -> Result<Student> {
    let invalidate = vec![
      KeyPattern::lists_under::<Student>(&draft.grade_id),
      KeyPattern::one::<Grade>(&draft.grade_id),
      KeyPattern::lists::<Grade>(),
      KeyPattern::one::<School>(&draft.school_id),
      KeyPattern::lists::<School>(),
    ];
    self.create::<Student>(draft, invalidate).await
  }

  /// Status changes move the grade's `active_students`.
  pub async fn update_student(
    &self,
    id: StudentId,
    patch: StudentPatch,
  ) -> Result<Student> {
    let invalidate = vec![
      KeyPattern::one::<Student>(&id),
      KeyPattern::lists::<Student>(),
      KeyPattern::kind::<Grade>(),
    ];
    self.update::<Student>(id, patch, invalidate).await
  }

  pub async fn delete_student(&self, id: StudentId) -> Result<()> {
    let invalidate = vec![
      KeyPattern::one::<Student>(&id),
      KeyPattern::lists::<Student>(),
      KeyPattern::kind::<Payment>(),
      KeyPattern::kind::<Grade>(),
      KeyPattern::kind::<School>(),
    ];
    self.delete::<Student>(id, invalidate).await
  }

  pub async fn create_payment(&self, draft: NewPayment) -> Result<Payment> {
    let invalidate = vec![
      KeyPattern::lists_under::<Payment>(&draft.student_id),
      KeyPattern::one::<Student>(&draft.student_id),
      KeyPattern::lists::<Student>(),
      KeyPattern::kind::<Grade>(),
    ];
    self.create::<Payment>(draft, invalidate).await
  }

  pub async fn update_payment(
    &self,
    id: PaymentId,
    patch: PaymentPatch,
  ) -> Result<Payment> {
    let invalidate = vec![
      KeyPattern::one::<Payment>(&id),
      KeyPattern::lists::<Payment>(),
      KeyPattern::kind::<Student>(),
      KeyPattern::kind::<Grade>(),
    ];
    self.update::<Payment>(id, patch, invalidate).await
  }

  pub async fn delete_payment(&self, id: PaymentId) -> Result<()> {
    let invalidate = vec![
      KeyPattern::one::<Payment>(&id),
      KeyPattern::lists::<Payment>(),
      KeyPattern::kind::<Student>(),
      KeyPattern::kind::<Grade>(),
    ];
    self.delete::<Payment>(id, invalidate).await
  }

  // ─── Navigation ────────────────────────────────────────────────────────────

  /// Breadcrumbs for `path` from cached entities only. Levels not yet in the
  /// cache are left off.
  pub fn breadcrumbs(&self, path: &str) -> Vec<Crumb> {
    let route = Route::parse(path);
    let school = self.cached::<School>(route.school_id());
    let grade = self.cached::<Grade>(route.grade_id());
    let student = self.cached::<Student>(route.student_id());

    breadcrumb::resolve(
      &route,
      &Loaded {
        school:  school.as_deref(),
        grade:   grade.as_deref(),
        student: student.as_deref(),
      },
    )
  }

  /// Load every entity `path` names, then resolve its breadcrumbs. Levels
  /// that fail to load are left off.
  pub async fn load_breadcrumbs(&self, path: &str) -> Vec<Crumb> {
    let route = Route::parse(path);
    let mut school = route.school_id().cloned().map(|id| self.school(id));
    let mut grade = route.grade_id().cloned().map(|id| self.grade(id));
    let mut student = route.student_id().cloned().map(|id| self.student(id));

    if let Some(handle) = school.as_mut() {
      handle.settled().await;
    }
    if let Some(handle) = grade.as_mut() {
      handle.settled().await;
    }
    if let Some(handle) = student.as_mut() {
      handle.settled().await;
    }
    self.breadcrumbs(path)
  }

  fn cached<E: Entity>(&self, id: Option<&E::Id>) -> Option<Arc<E>> {
    let key = QueryKey::one::<E>(id?);
    self.cache.peek::<E>(&key).data
  }
}
