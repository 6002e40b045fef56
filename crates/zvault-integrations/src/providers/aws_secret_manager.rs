use super::aws_parameter_store::{AWS_CREDENTIALS, REGION};
use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, FieldSpec, ProviderHandler};
use crate::types::{CreateIntegrationRequest, MappingBehavior, SecretTag};
use crate::validation::ValidationErrors;

const MAPPING_BEHAVIOR: &str = "mappingBehavior";

const FIELDS: &[FieldSpec] = &[
    REGION,
    FieldSpec::choice(
        MAPPING_BEHAVIOR,
        "Mapping behavior",
        &["many-to-one", "one-to-one"],
        "many-to-one",
    ),
    FieldSpec::text("secretName", "AWS secret name"),
    FieldSpec::text("secretPrefix", "Secret prefix"),
    FieldSpec::text("tagKey", "Tag key"),
    FieldSpec::text("tagValue", "Tag value"),
];

pub(crate) struct AwsSecretManager;

impl AwsSecretManager {
    fn mapping(input: &FormInput<'_>) -> MappingBehavior {
        input
            .field(MAPPING_BEHAVIOR)
            .and_then(MappingBehavior::parse)
            .unwrap_or(MappingBehavior::ManyToOne)
    }
}

impl ProviderHandler for AwsSecretManager {
    fn provider(&self) -> Provider {
        Provider::AwsSecretManager
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        AWS_CREDENTIALS
    }

    // Keys are listed per region; the default AWS-managed key is used when
    // none is chosen.
    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("kmsKey", "KMS keys", "aws-secrets-manager/kms-keys", "kmsKeys")
                .name_field("alias")
                .field("region", "region")
                .optional(),
        ]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        if input.field("region").is_none() {
            errors.add("region", "Region cannot be blank");
        }
        if Self::mapping(input) == MappingBehavior::ManyToOne && input.field("secretName").is_none() {
            errors.add("secretName", "Secret name cannot be blank");
        }
        match (input.field("tagKey"), input.field("tagValue")) {
            (Some(_), None) => errors.add("tagValue", "Tag value cannot be blank"),
            (None, Some(_)) => errors.add("tagKey", "Tag key cannot be blank"),
            _ => {}
        }
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        let mapping = Self::mapping(input);
        request.region = input.field_owned("region");
        if mapping == MappingBehavior::ManyToOne {
            request.app = input.field_owned("secretName");
        }

        let metadata = &mut request.metadata;
        metadata.mapping_behavior = Some(mapping);
        metadata.secret_prefix = input.field_owned("secretPrefix");
        if let (Some(key), Some(value)) = (input.field_owned("tagKey"), input.field_owned("tagValue")) {
            metadata.secret_aws_tag = vec![SecretTag { key, value }];
        }
        metadata.kms_key_id = input.selected("kmsKey").map(|k| k.id.clone());
    }
}
