use serde::{Deserialize, Serialize};

/// One uploaded file, held only for the lifetime of its request.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("image/"))
    }
}

/// The detection backend's success body. Field names are camelCase on the
/// wire; `number_plate` is null or empty when no plate was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub success: bool,
    pub image_url: String,
    pub message: String,
    pub number_plate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            data: vec![0xff, 0xd8],
            content_type: content_type.map(str::to_string),
            filename: Some("car.jpg".to_string()),
        }
    }

    #[test]
    fn image_check_accepts_image_prefix() {
        assert!(file(Some("image/jpeg")).is_image());
        assert!(file(Some("image/png")).is_image());
    }

    #[test]
    fn image_check_rejects_other_types() {
        assert!(!file(Some("text/plain")).is_image());
        assert!(!file(Some("application/pdf")).is_image());
        assert!(!file(None).is_image());
    }

    #[test]
    fn detection_result_uses_camel_case_keys() {
        let json = r#"{
            "success": true,
            "imageUrl": "/img/1.jpg",
            "message": "Plate found",
            "numberPlate": "XYZ 789"
        }"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.image_url, "/img/1.jpg");
        assert_eq!(result.number_plate.as_deref(), Some("XYZ 789"));

        let out = serde_json::to_value(&result).unwrap();
        assert_eq!(out["imageUrl"], "/img/1.jpg");
        assert_eq!(out["numberPlate"], "XYZ 789");
    }

    #[test]
    fn detection_result_accepts_null_plate() {
        let json = r#"{"success":true,"imageUrl":"/img/2.jpg","message":"No number plate detected in the image.","numberPlate":null}"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.number_plate, None);
    }
}
