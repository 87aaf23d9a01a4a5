pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{
    init_academic_years_router, init_departments_router, init_enrollments_router,
    init_parent_links_router, init_sections_router, init_subjects_router,
    init_teacher_assignments_router,
};
pub use service::{
    AcademicYearService, DepartmentService, EnrollmentService, ParentLinkService, SectionService,
    SubjectService, TeacherAssignmentService,
};
