
// Integration suite:
// - smoke_tests: config defaults and the static routes
// - upload_flow: the whole upload pipeline against a recording calendar
// - google_calendar_api: the REST client and token refresh against a mock server
