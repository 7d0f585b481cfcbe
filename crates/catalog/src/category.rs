use serde::{Deserialize, Serialize};

use doyashop_core::{require_non_blank, DocumentId, DomainResult, Entity};

/// Named grouping of listings. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    pub const NAME: &'static str = "name";

    pub fn create(id: DocumentId, req: NewCategory) -> DomainResult<Self> {
        require_non_blank("name", &req.name)?;
        Ok(Self {
            id,
            name: req.name.trim().to_string(),
            image: req.image,
            description: req.description,
        })
    }

    pub fn name_only(&self) -> CategoryName {
        CategoryName {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl Entity for Category {
    fn id(&self) -> DocumentId {
        self.id
    }
}

/// `{_id, name}` projection used by the listing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryName {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_and_requires_name() {
        let req = NewCategory {
            name: "  Android  ".to_string(),
            image: None,
            description: None,
        };
        let category = Category::create(DocumentId::new(), req).unwrap();
        assert_eq!(category.name, "Android");

        let blank = NewCategory {
            name: " ".to_string(),
            image: None,
            description: None,
        };
        assert!(Category::create(DocumentId::new(), blank).is_err());
    }

    #[test]
    fn projection_keeps_id_and_name() {
        let category = Category {
            id: DocumentId::new(),
            name: "iPhone".to_string(),
            image: Some("https://img/iphone.png".to_string()),
            description: None,
        };
        let json = serde_json::to_value(category.name_only()).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(json["name"], "iPhone");
    }
}
