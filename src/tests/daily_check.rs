#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use httpmock::Method::POST;

    use crate::config::service::{EmailConfig, ServiceConfig};
    use crate::tests::common::*;
    use crate::watchlist::daily::{initial_store_id, run_daily_check};
    use crate::watchlist::store::{WatchEntry, Watchlist};

    fn config() -> ServiceConfig {
        let mut cfg = ServiceConfig::default();
        cfg.stores = BTreeMap::from([
            ("Dunedin".to_owned(), "store-dn".to_owned()),
            ("Chaffers".to_owned(), "store-ch".to_owned()),
        ]);
        cfg.email = Some(EmailConfig {
            smtp_host: "localhost".to_owned(),
            smtp_port: 587,
            username: None,
            password: None,
            sender: "alerts@example.com".to_owned(),
            recipient: "me@example.com".to_owned(),
            subject: "NewWorld Specials Alert".to_owned(),
        });
        cfg
    }

    fn entry(name: &str, store: &str, target_price: Option<f64>, min_discount_percent: Option<f64>) -> WatchEntry {
        WatchEntry {
            friendly_name: name.to_owned(),
            store: store.to_owned(),
            target_price,
            min_discount_percent,
        }
    }

    async fn mock_product(h: &Harness, store_id: &str, product: serde_json::Value) {
        let id = product["productId"].as_str().unwrap().to_owned();
        let filter = format!(r#"productID:\"{}\" AND stores:{}"#, id, store_id);
        h.server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path(SEARCH_PATH)
                    .json_body_includes(format!(r#"{{"algoliaQuery":{{"filters":"{}"}}}}"#, filter));
                then.status(200).json_body(json!({ "products": [product] }));
            })
            .await;
    }

    #[tokio::test]
    async fn alerts_are_emailed_and_failures_skipped() {
        let h = Harness::start().await;
        let cfg = config();
        let watchlist = Watchlist::from([
            ("1-EA".to_owned(), entry("Aveeno Lotion", "Dunedin", Some(5.00), None)),
            ("2-EA".to_owned(), entry("Shampoo", "Dunedin", Some(5.00), None)),
            ("3-EA".to_owned(), entry("Gone", "Dunedin", Some(5.00), None)),
            ("4-EA".to_owned(), entry("Elsewhere", "Mosgiel", Some(5.00), None)),
        ]);

        mock_product(&h, "store-dn", product_json("1-EA", "Aveeno Lotion", 699, Some(450))).await;
        mock_product(&h, "store-dn", product_json("2-EA", "Shampoo", 699, Some(650))).await;
        h.server
            .mock_async(|when, then| {
                when.method(POST).path(SEARCH_PATH).json_body_includes(r#"{"algoliaQuery":{"query":"3-EA"}}"#);
                then.status(200).json_body(json!({ "products": [] }));
            })
            .await;

        let store_id = initial_store_id(&cfg, &watchlist).unwrap();
        let mut client = h.client(store_id, ScriptedSource::new([hour_jwt()])).await.unwrap();
        let mailer = RecordingMailer::default();

        let report = run_daily_check(&mut client, &cfg, &watchlist, Some(&mailer)).await;

        assert_eq!(report.checked, 2);
        assert_eq!(report.alerts.len(), 1);
        let alert = &report.alerts[0];
        assert_eq!(alert.product_id, "1-EA");
        assert_eq!(alert.promo_price, 4.50);
        assert!(alert.price_triggered);

        let skipped: Vec<&str> = report.skipped.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(skipped, vec!["3-EA", "4-EA"]);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "NewWorld Specials Alert");
        assert!(sent[0].1.contains("- Aveeno Lotion: Now $4.50 (was $6.99, 35.6% off)"));
        assert!(!sent[0].1.contains("Shampoo"));
    }

    #[tokio::test]
    async fn one_email_per_store_with_single_token() {
        let h = Harness::start().await;
        let cfg = config();
        let watchlist = Watchlist::from([
            ("1-EA".to_owned(), entry("Aveeno Lotion", "Dunedin", None, Some(20.0))),
            ("5-EA".to_owned(), entry("Coffee", "Chaffers", Some(10.0), None)),
        ]);

        mock_product(&h, "store-dn", product_json("1-EA", "Aveeno Lotion", 699, Some(450))).await;
        mock_product(&h, "store-ch", product_json("5-EA", "Coffee", 1299, Some(999))).await;

        let source = ScriptedSource::new([hour_jwt()]);
        let mut client = h.client("store-dn", source.clone()).await.unwrap();
        let mailer = RecordingMailer::default();

        let report = run_daily_check(&mut client, &cfg, &watchlist, Some(&mailer)).await;

        assert_eq!(report.alerts.len(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(source.calls(), 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|(_, body)| body.contains("at Chaffers") && body.contains("Coffee")));
        assert!(sent.iter().any(|(_, body)| body.contains("at Dunedin") && body.contains("Aveeno Lotion")));
    }

    #[tokio::test]
    async fn no_alerts_means_no_email() {
        let h = Harness::start().await;
        let cfg = config();
        let watchlist = Watchlist::from([("2-EA".to_owned(), entry("Shampoo", "Dunedin", Some(5.00), None))]);
        mock_product(&h, "store-dn", product_json("2-EA", "Shampoo", 699, None)).await;

        let mut client = h.client("store-dn", ScriptedSource::new([hour_jwt()])).await.unwrap();
        let mailer = RecordingMailer::default();

        let report = run_daily_check(&mut client, &cfg, &watchlist, Some(&mailer)).await;

        assert_eq!(report.checked, 1);
        assert!(report.alerts.is_empty());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn initial_store_skips_unknown_names() {
        let cfg = config();
        let watchlist = Watchlist::from([
            ("0-EA".to_owned(), entry("A", "Mosgiel", None, None)),
            ("9-EA".to_owned(), entry("B", "Chaffers", None, None)),
        ]);

        assert_eq!(initial_store_id(&cfg, &watchlist), Some("store-ch"));
        assert_eq!(initial_store_id(&cfg, &Watchlist::new()), None);
    }
}
