//! Integration specifications for the adoption application state machine:
//! submission uniqueness, the two-stage review guards, and handover.

mod common;

use common::*;
use pawflow::workflows::adoption::domain::AdoptionStatus;
use pawflow::workflows::adoption::AdoptionError;
use pawflow::workflows::clients::PetAvailability;
use pawflow::workflows::ids::PetId;

mod submission {
    use super::*;

    #[test]
    fn submit_creates_a_pending_application() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission succeeds");

        assert_eq!(application.status, AdoptionStatus::Pending);
        assert_eq!(application.pet_id, PetId(7));
        assert_eq!(application.applicant_id, APPLICANT);
        assert!(application.reject_reason.is_none());
    }

    #[test]
    fn second_open_application_for_same_pair_is_a_conflict() {
        let world = build_world();
        let first = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("first submission");

        match world.adoptions.submit(PetId(7), APPLICANT, ORG) {
            Err(AdoptionError::DuplicatePending) => {}
            other => panic!("expected duplicate conflict, got {other:?}"),
        }

        // A different pet is a different pair.
        world
            .adoptions
            .submit(PetId(8), APPLICANT, ORG)
            .expect("different pet submission succeeds");

        // Once the first reaches a terminal status the pair frees up.
        world
            .adoptions
            .review_by_org(first.id, ORG, false, Some("not a match"))
            .expect("org rejection");
        world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("resubmission after terminal status succeeds");
    }

    #[test]
    fn completed_application_also_frees_the_pair() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world.repository.set_status(application.id, AdoptionStatus::Completed);

        world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("resubmission after completion succeeds");
    }
}

mod org_review {
    use super::*;

    #[test]
    fn approval_moves_pending_to_org_approved() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        let updated = world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("approval succeeds");
        assert_eq!(updated.status, AdoptionStatus::OrgApproved);
    }

    #[test]
    fn review_is_rejected_from_every_status_but_pending() {
        for status in AdoptionStatus::ALL {
            let world = build_world();
            let application = world
                .adoptions
                .submit(PetId(7), APPLICANT, ORG)
                .expect("submission");
            world.repository.set_status(application.id, status);

            let outcome = world
                .adoptions
                .review_by_org(application.id, ORG, true, None);
            if status == AdoptionStatus::Pending {
                assert!(outcome.is_ok(), "pending must be reviewable");
            } else {
                match outcome {
                    Err(AdoptionError::InvalidTransition { from }) => {
                        assert_eq!(from, status);
                    }
                    other => panic!("expected invalid transition from {status:?}, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn foreign_org_is_forbidden() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        match world
            .adoptions
            .review_by_org(application.id, pawflow::workflows::ids::OrgId(99), true, None)
        {
            Err(AdoptionError::Forbidden) => {}
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[test]
    fn rejection_requires_a_nonempty_reason() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        for reason in [None, Some(""), Some("   ")] {
            match world
                .adoptions
                .review_by_org(application.id, ORG, false, reason)
            {
                Err(AdoptionError::Validation(_)) => {}
                other => panic!("expected validation error for {reason:?}, got {other:?}"),
            }
        }

        let updated = world
            .adoptions
            .review_by_org(application.id, ORG, false, Some("home check failed"))
            .expect("rejection with reason succeeds");
        assert_eq!(updated.status, AdoptionStatus::OrgRejected);
        assert_eq!(updated.reject_reason.as_deref(), Some("home check failed"));
    }

    #[test]
    fn approval_reserves_the_pet_best_effort() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("approval");

        assert_eq!(
            world.pets.last_status(PetId(7)),
            Some(PetAvailability::Reserved)
        );
    }

    #[test]
    fn approval_survives_a_dead_pet_registry() {
        let world = build_world();
        world.pets.set_failing(true);
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        let updated = world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("approval still succeeds");
        assert_eq!(updated.status, AdoptionStatus::OrgApproved);
        assert!(world.pets.flips().is_empty());
    }
}

mod platform_review {
    use super::*;

    #[test]
    fn review_is_rejected_from_every_status_but_org_approved() {
        for status in AdoptionStatus::ALL {
            let world = build_world();
            let application = world
                .adoptions
                .submit(PetId(7), APPLICANT, ORG)
                .expect("submission");
            world.repository.set_status(application.id, status);

            let outcome = world.adoptions.review_by_platform(application.id, true, None);
            if status == AdoptionStatus::OrgApproved {
                assert!(outcome.is_ok(), "org-approved must be reviewable");
            } else {
                match outcome {
                    Err(AdoptionError::InvalidTransition { from }) => assert_eq!(from, status),
                    other => panic!("expected invalid transition from {status:?}, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn rejection_persists_the_reason_and_frees_the_pet() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("org approval");

        match world.adoptions.review_by_platform(application.id, false, None) {
            Err(AdoptionError::Validation(_)) => {}
            other => panic!("expected validation error, got {other:?}"),
        }

        let updated = world
            .adoptions
            .review_by_platform(application.id, false, Some("records incomplete"))
            .expect("rejection succeeds");
        assert_eq!(updated.status, AdoptionStatus::PlatformRejected);
        assert_eq!(updated.reject_reason.as_deref(), Some("records incomplete"));
        assert_eq!(
            world.pets.last_status(PetId(7)),
            Some(PetAvailability::Available)
        );
    }
}

mod handover {
    use super::*;
    use pawflow::workflows::interview::domain::BookingStatus;
    use pawflow::workflows::interview::repository::BookingStore;

    fn approved_application(world: &World) -> pawflow::workflows::adoption::AdoptionApplication {
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("org approval");
        world
            .adoptions
            .review_by_platform(application.id, true, None)
            .expect("platform approval")
    }

    #[test]
    fn handover_without_a_booking_completes() {
        let world = build_world();
        let application = approved_application(&world);

        let updated = world
            .adoptions
            .complete_handover(application.id, ORG)
            .expect("handover succeeds");
        assert_eq!(updated.status, AdoptionStatus::Completed);
        assert_eq!(
            world.pets.last_status(PetId(7)),
            Some(PetAvailability::Adopted)
        );
    }

    #[test]
    fn handover_is_allowed_straight_from_org_approved() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("org approval");

        let updated = world
            .adoptions
            .complete_handover(application.id, ORG)
            .expect("handover succeeds from ORG_APPROVED");
        assert_eq!(updated.status, AdoptionStatus::Completed);
    }

    #[test]
    fn handover_is_blocked_until_the_interview_is_done() {
        let world = build_world();
        let application = approved_application(&world);
        let slot = tomorrow_slot(&world);
        world
            .interviews
            .request(application.id, slot.id)
            .expect("booking request");

        match world.adoptions.complete_handover(application.id, ORG) {
            Err(AdoptionError::InterviewUnfinished) => {}
            other => panic!("expected unfinished interview error, got {other:?}"),
        }

        world.interviews.confirm(application.id).expect("confirm");
        match world.adoptions.complete_handover(application.id, ORG) {
            Err(AdoptionError::InterviewUnfinished) => {}
            other => panic!("expected unfinished interview error, got {other:?}"),
        }

        world.interviews.complete(application.id).expect("complete");
        let booking = world
            .bookings
            .fetch_by_app(application.id)
            .expect("fetch")
            .expect("booking exists");
        assert_eq!(booking.status, BookingStatus::Done);

        let updated = world
            .adoptions
            .complete_handover(application.id, ORG)
            .expect("handover succeeds once the interview is done");
        assert_eq!(updated.status, AdoptionStatus::Completed);
    }

    #[test]
    fn handover_guards_org_and_status() {
        let world = build_world();
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        match world
            .adoptions
            .complete_handover(application.id, pawflow::workflows::ids::OrgId(99))
        {
            Err(AdoptionError::Forbidden) => {}
            other => panic!("expected forbidden, got {other:?}"),
        }

        match world.adoptions.complete_handover(application.id, ORG) {
            Err(AdoptionError::InvalidTransition { from }) => {
                assert_eq!(from, AdoptionStatus::Pending);
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }
}

mod routing {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pawflow::workflows::adoption::{adoption_router, AdoptionRouterState};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn build_router(world: &World) -> axum::Router {
        adoption_router(AdoptionRouterState {
            service: world.adoptions.clone(),
            orgs: world.orgs.clone(),
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn submit_request(user: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/adoptions")
            .header("content-type", "application/json")
            .header("x-user-id", user.to_string())
            .body(Body::from(
                serde_json::to_vec(&json!({ "petId": 7, "orgId": 1 })).expect("serialize"),
            ))
            .expect("request")
    }

    #[tokio::test]
    async fn submit_wraps_the_application_in_the_envelope() {
        let world = build_world();
        let router = build_router(&world);

        let response = router.oneshot(submit_request(3)).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["code"], 200);
        assert_eq!(payload["data"]["status"], "PENDING");
        assert_eq!(payload["data"]["applicantId"], 3);
    }

    #[tokio::test]
    async fn duplicate_submission_maps_to_conflict() {
        let world = build_world();
        let router = build_router(&world);

        router
            .clone()
            .oneshot(submit_request(3))
            .await
            .expect("first dispatch");
        let response = router.oneshot(submit_request(3)).await.expect("dispatch");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let payload = body_json(response).await;
        assert_eq!(payload["code"], 409);
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_rejected() {
        let world = build_world();
        let router = build_router(&world);

        let request = Request::builder()
            .method("GET")
            .uri("/adoptions/me/adoptions")
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reviewer_outside_any_org_is_forbidden() {
        let world = build_world();
        let router = build_router(&world);
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/adoptions/{}/approve", application.id))
            .header("x-user-id", "555")
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn platform_review_requires_the_auditor_role() {
        let world = build_world();
        let router = build_router(&world);
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");
        world
            .adoptions
            .review_by_org(application.id, ORG, true, None)
            .expect("org approval");

        let forbidden = Request::builder()
            .method("POST")
            .uri(format!("/adoptions/{}/platform-approve", application.id))
            .header("x-user-id", "3")
            .body(Body::empty())
            .expect("request");
        let response = router
            .clone()
            .oneshot(forbidden)
            .await
            .expect("dispatch");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let allowed = Request::builder()
            .method("POST")
            .uri(format!("/adoptions/{}/platform-approve", application.id))
            .header("x-user-id", "200")
            .header("x-user-roles", "AUDITOR")
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(allowed).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["data"]["status"], "PLATFORM_APPROVED");
    }

    #[tokio::test]
    async fn reject_without_reason_maps_to_validation() {
        let world = build_world();
        let router = build_router(&world);
        let application = world
            .adoptions
            .submit(PetId(7), APPLICANT, ORG)
            .expect("submission");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/adoptions/{}/reject", application.id))
            .header("content-type", "application/json")
            .header("x-user-id", "100")
            .body(Body::from(
                serde_json::to_vec(&json!({})).expect("serialize"),
            ))
            .expect("request");
        let response = router.oneshot(request).await.expect("dispatch");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = body_json(response).await;
        assert_eq!(payload["code"], 400);
    }
}
