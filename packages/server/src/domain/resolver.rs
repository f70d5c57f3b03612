//! エンティティ解決：Principal がコネクション上でどのエンティティとして振る舞うか

use super::{
    entity::{EntityKind, Principal, RelationLabel, ResolvedEntity, Role},
    error::AccessError,
    relationship::{PatientLink, RelationshipGraph},
    value_object::EntityId,
};

/// Principal の実効エンティティを解決する（主張があればそれに従う）
///
/// 解決に副作用はない。結果は 1 コネクションの間だけ保持でき、
/// エッジは変わるため次のコネクションでは解決し直すこと。
#[derive(Clone)]
pub struct EntityResolver {
    graph: RelationshipGraph,
}

impl EntityResolver {
    pub fn new(graph: RelationshipGraph) -> Self {
        Self { graph }
    }

    pub async fn resolve(
        &self,
        principal: &Principal,
        claim: Option<&EntityId>,
    ) -> Result<ResolvedEntity, AccessError> {
        match principal.role {
            Role::Admin => Ok(Self::resolve_admin(principal)),
            Role::Doctor | Role::Hospital => Self::resolve_profile(principal, claim),
            Role::Patient => self.resolve_patient(principal, claim).await,
        }
    }

    /// 管理者は自分自身として振る舞う。主張は受け付けるが無視する
    fn resolve_admin(principal: &Principal) -> ResolvedEntity {
        ResolvedEntity::new(EntityId::from_user(&principal.user_id), EntityKind::Admin)
    }

    /// 医師と病院はプロフィールをちょうど 1 つ持つ
    fn resolve_profile(
        principal: &Principal,
        claim: Option<&EntityId>,
    ) -> Result<ResolvedEntity, AccessError> {
        let kind = principal.role.entity_kind();
        let profile_id = principal.profile_id.as_ref().ok_or_else(|| {
            AccessError::Forbidden(format!(
                "No {} profile is linked to this account",
                principal.role.as_str()
            ))
        })?;

        match claim {
            Some(claimed) if claimed != profile_id => {
                tracing::warn!(
                    "User '{}' claimed entity '{}' but owns profile '{}'",
                    principal.user_id,
                    claimed,
                    profile_id
                );
                Err(AccessError::Forbidden(
                    "The claimed entity does not belong to this account".to_string(),
                ))
            }
            _ => Ok(ResolvedEntity::new(profile_id.clone(), kind)),
        }
    }

    /// 患者ロールはユーザー↔患者エッジを通じて複数の患者として振る舞える
    async fn resolve_patient(
        &self,
        principal: &Principal,
        claim: Option<&EntityId>,
    ) -> Result<ResolvedEntity, AccessError> {
        let links = self.graph.patients_of_user(&principal.user_id).await?;

        if let Some(claimed) = claim {
            return links
                .iter()
                .find(|link| &link.patient_id == claimed)
                .map(|link| ResolvedEntity::new(link.patient_id.clone(), EntityKind::Patient))
                .ok_or_else(|| {
                    tracing::warn!(
                        "User '{}' has no relation to claimed patient '{}'",
                        principal.user_id,
                        claimed
                    );
                    AccessError::Forbidden(
                        "The claimed patient is not linked to this account".to_string(),
                    )
                });
        }

        let chosen = Self::default_patient(&links).ok_or_else(|| {
            AccessError::Forbidden("No patient profile is linked to this account".to_string())
        })?;

        if chosen.label != RelationLabel::Oneself {
            tracing::warn!(
                "User '{}' has no 'self' relation; falling back to patient '{}' (lowest edge '{}')",
                principal.user_id,
                chosen.patient_id,
                chosen.edge_id
            );
        }
        Ok(ResolvedEntity::new(chosen.patient_id.clone(), EntityKind::Patient))
    }

    /// 主張がないときに振る舞う患者を選ぶ
    ///
    /// `links` はエッジ ID 順。最初の "self" エッジを優先し、なければ最初のエッジを使う。
    fn default_patient(links: &[PatientLink]) -> Option<&PatientLink> {
        let mut own = links.iter().filter(|l| l.label == RelationLabel::Oneself);
        match (own.next(), own.next()) {
            (Some(first), None) => Some(first),
            (Some(first), Some(_)) => {
                tracing::warn!(
                    "Several 'self' relations found; using the lowest edge '{}'",
                    first.edge_id
                );
                Some(first)
            }
            (None, _) => links.first(),
        }
    }
}
