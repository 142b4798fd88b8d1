/// Upload authorization for direct-to-CDN image uploads
use crate::error::Result;
use crate::services::UploadSigner;
use actix_web::{web, HttpResponse};
use chrono::Utc;

pub async fn upload_auth(signer: web::Data<UploadSigner>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(signer.authorize(Utc::now().timestamp())))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload/auth", web::get().to(upload_auth));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_upload_auth_is_signed() {
        let signer = UploadSigner::new(&UploadConfig {
            url_endpoint: "https://cdn.example.com".into(),
            public_key: "public".into(),
            private_key: "private".into(),
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(signer.clone()))
                .configure(configure),
        )
        .await;

        let before = Utc::now().timestamp();
        let req = test::TestRequest::get().uri("/upload/auth").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let token = body["token"].as_str().unwrap().to_string();
        let expire = body["expire"].as_i64().unwrap();
        assert!(expire >= before + 1800);
        assert_eq!(
            body["signature"].as_str().unwrap(),
            signer.sign(token, expire).signature
        );
    }
}
