//! 标签与匹配条件
//!
//! 标签是不透明的字符串。条件（[`Criterion`]）是一组必须全部具备的标签，
//! 集群条件（[`ClusterCriteria`]）是按优先级排列的条件列表，首个命中即生效。
//!
//! 系统标签 `id:<id>` 与 `name:<name>` 由 [`normalize_system_tags`] 统一维护，
//! 客户端可以通过它们精确定位某个资源。

use std::collections::BTreeSet;
use std::fmt;

use fedexec_core::{PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};

pub const ID_TAG_PREFIX: &str = "id:";
pub const NAME_TAG_PREFIX: &str = "name:";
pub const MAX_TAG_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

/// 有序去重的标签集合
pub type TagSet = BTreeSet<Tag>;

impl Tag {
    pub fn new(value: impl Into<String>) -> PlatformResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlatformError::precondition("标签不能为空"));
        }
        if trimmed.len() > MAX_TAG_LENGTH {
            return Err(PlatformError::precondition(format!(
                "标签长度 {} 超过上限 {MAX_TAG_LENGTH}",
                trimmed.len()
            )));
        }
        Ok(Tag(trimmed.to_string()))
    }

    pub fn id_tag(id: &str) -> PlatformResult<Self> {
        Tag::new(format!("{ID_TAG_PREFIX}{id}"))
    }

    pub fn name_tag(name: &str) -> PlatformResult<Self> {
        Tag::new(format!("{NAME_TAG_PREFIX}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_id_tag(&self) -> bool {
        self.0.starts_with(ID_TAG_PREFIX)
    }

    pub fn is_name_tag(&self) -> bool {
        self.0.starts_with(NAME_TAG_PREFIX)
    }

    pub fn is_system(&self) -> bool {
        self.is_id_tag() || self.is_name_tag()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = PlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

/// 从字符串列表构造标签集合
pub fn tag_set<I, S>(values: I) -> PlatformResult<TagSet>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Tag::new).collect()
}

/// 一组必须全部满足的标签（超集匹配），非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TagSet", into = "TagSet")]
pub struct Criterion {
    tags: TagSet,
}

impl Criterion {
    pub fn new(tags: TagSet) -> PlatformResult<Self> {
        if tags.is_empty() {
            return Err(PlatformError::precondition("匹配条件至少需要一个标签"));
        }
        Ok(Self { tags })
    }

    pub fn from_strs<I, S>(values: I) -> PlatformResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Criterion::new(tag_set(values)?)
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// 候选标签集合是否为本条件的超集
    pub fn is_satisfied_by(&self, candidate: &TagSet) -> bool {
        self.tags.is_subset(candidate)
    }
}

impl TryFrom<TagSet> for Criterion {
    type Error = PlatformError;

    fn try_from(tags: TagSet) -> Result<Self, Self::Error> {
        Criterion::new(tags)
    }
}

impl From<Criterion> for TagSet {
    fn from(criterion: Criterion) -> Self {
        criterion.tags
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(Tag::as_str).collect();
        write!(f, "{{{}}}", tags.join(","))
    }
}

/// 按优先级排列的集群条件，非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Criterion>", into = "Vec<Criterion>")]
pub struct ClusterCriteria(Vec<Criterion>);

impl ClusterCriteria {
    pub fn new(criteria: Vec<Criterion>) -> PlatformResult<Self> {
        if criteria.is_empty() {
            return Err(PlatformError::precondition("集群条件列表不能为空"));
        }
        Ok(Self(criteria))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<Criterion>> for ClusterCriteria {
    type Error = PlatformError;

    fn try_from(criteria: Vec<Criterion>) -> Result<Self, Self::Error> {
        ClusterCriteria::new(criteria)
    }
}

impl From<ClusterCriteria> for Vec<Criterion> {
    fn from(criteria: ClusterCriteria) -> Self {
        criteria.0
    }
}

impl<'a> IntoIterator for &'a ClusterCriteria {
    type Item = &'a Criterion;
    type IntoIter = std::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// 客户端提交的标签不能落在系统命名空间
pub fn reject_system_tags(tags: &TagSet) -> PlatformResult<()> {
    if let Some(tag) = tags.iter().find(|tag| tag.is_system()) {
        return Err(PlatformError::precondition(format!(
            "标签 {tag} 属于系统命名空间，只能由平台维护"
        )));
    }
    Ok(())
}

/// 保证标签集合中恰好有一个 `id:<id>` 与一个 `name:<name>` 标签
///
/// 旧的 `name:` 标签会被替换；出现多个 `id:` 标签，或唯一的 `id:` 标签指向
/// 其他 id，都说明数据已损坏，直接返回错误。用户标签原样保留。
pub fn normalize_system_tags(tags: &TagSet, id: &str, name: &str) -> PlatformResult<TagSet> {
    let expected_id = Tag::id_tag(id)?;
    let expected_name = Tag::name_tag(name)?;

    let id_tags: Vec<&Tag> = tags.iter().filter(|t| t.is_id_tag()).collect();
    match id_tags.as_slice() {
        [] => {}
        [existing] if **existing == expected_id => {}
        [existing] => {
            return Err(PlatformError::precondition(format!(
                "资源 {id} 携带了不属于它的系统标签 {existing}"
            )));
        }
        many => {
            return Err(PlatformError::precondition(format!(
                "资源 {id} 存在 {} 个 id 系统标签",
                many.len()
            )));
        }
    }

    let mut normalized: TagSet = tags.iter().filter(|t| !t.is_name_tag()).cloned().collect();
    normalized.insert(expected_id);
    normalized.insert(expected_name);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> TagSet {
        tag_set(values.iter().copied()).unwrap()
    }

    #[test]
    fn test_tag_validation() {
        assert_eq!(Tag::new("  prod ").unwrap().as_str(), "prod");
        assert!(Tag::new("").is_err());
        assert!(Tag::new("   ").is_err());
        assert!(Tag::new("x".repeat(MAX_TAG_LENGTH)).is_ok());
        assert!(Tag::new("x".repeat(MAX_TAG_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_tag_set_deduplicates() {
        let set = tags(&["prod", "hadoop", "prod"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_criterion_requires_tags() {
        assert!(Criterion::new(TagSet::new()).is_err());
        assert!(ClusterCriteria::new(vec![]).is_err());
    }

    #[test]
    fn test_criterion_superset_match() {
        let criterion = Criterion::from_strs(["prod", "hadoop"]).unwrap();
        assert!(criterion.is_satisfied_by(&tags(&["prod", "hadoop", "yarn"])));
        assert!(criterion.is_satisfied_by(&tags(&["prod", "hadoop"])));
        assert!(!criterion.is_satisfied_by(&tags(&["prod"])));
    }

    #[test]
    fn test_criterion_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<Criterion>("[]").is_err());
        let criterion: Criterion = serde_json::from_str(r#"["hive"]"#).unwrap();
        assert_eq!(criterion.to_string(), "{hive}");
    }

    #[test]
    fn test_normalize_adds_system_tags() {
        let normalized = normalize_system_tags(&tags(&["prod"]), "c1", "alpha").unwrap();
        assert_eq!(normalized, tags(&["prod", "id:c1", "name:alpha"]));
    }

    #[test]
    fn test_normalize_replaces_stale_name() {
        let original = tags(&["prod", "id:c1", "name:alpha", "name:older"]);
        let normalized = normalize_system_tags(&original, "c1", "beta").unwrap();
        assert_eq!(normalized, tags(&["prod", "id:c1", "name:beta"]));
    }

    #[test]
    fn test_normalize_rejects_duplicate_id_tags() {
        let corrupted = tags(&["id:c1", "id:c2"]);
        assert!(normalize_system_tags(&corrupted, "c1", "alpha").is_err());
    }

    #[test]
    fn test_normalize_rejects_foreign_id_tag() {
        let corrupted = tags(&["id:c2"]);
        assert!(normalize_system_tags(&corrupted, "c1", "alpha").is_err());
    }

    #[test]
    fn test_reject_system_tags() {
        assert!(reject_system_tags(&tags(&["prod", "etl"])).is_ok());
        assert!(reject_system_tags(&tags(&["prod", "id:c1"])).is_err());
        assert!(reject_system_tags(&tags(&["name:alpha"])).is_err());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let original = tags(&["prod", "spark", "name:old"]);
        let once = normalize_system_tags(&original, "c1", "alpha").unwrap();
        let twice = normalize_system_tags(&once, "c1", "alpha").unwrap();
        assert_eq!(once, twice);
    }
}
